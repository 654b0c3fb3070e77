// Text classification: three independent classifier services, gated.
//
// species → (gate) → lost/found → (gate) → sex
//
// Each service is a model endpoint that takes pandas "records" JSON and
// answers with a JSON array whose first element is the label.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{CrawlError, Result};
use crate::types::{CardType, Classification, Sex, Species, Verdict};

const RECORDS_CONTENT_TYPE: &str = "application/json; format=pandas-records";

/// A service that assigns one label to a piece of text.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn label(&self, text: &str) -> Result<String>;
}

/// HTTP client for one classifier endpoint.
pub struct ClassifierClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ClassifierClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextClassifier for ClassifierClient {
    async fn label(&self, text: &str) -> Result<String> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, RECORDS_CONTENT_TYPE)
            .body(json!([{ "text": text }]).to_string())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CrawlError::Transport(format!(
                "classifier {} returned {status}: {body}",
                self.endpoint
            )));
        }

        let labels: Vec<Value> = resp.json().await?;
        match labels.into_iter().next() {
            Some(Value::String(label)) => Ok(label),
            other => Err(CrawlError::Transport(format!(
                "classifier {} returned no string label: {other:?}",
                self.endpoint
            ))),
        }
    }
}

/// The three classifiers a post goes through, each pointed at its own endpoint.
pub struct ClassificationPipeline {
    species: Box<dyn TextClassifier>,
    card_type: Box<dyn TextClassifier>,
    sex: Box<dyn TextClassifier>,
}

impl ClassificationPipeline {
    pub fn new(
        species: Box<dyn TextClassifier>,
        card_type: Box<dyn TextClassifier>,
        sex: Box<dyn TextClassifier>,
    ) -> Self {
        Self {
            species,
            card_type,
            sex,
        }
    }

    pub async fn classify_species(&self, text: &str) -> Result<Option<Species>> {
        Species::from_label(&self.species.label(text).await?)
    }

    pub async fn classify_card_type(&self, text: &str) -> Result<Option<CardType>> {
        CardType::from_label(&self.card_type.label(text).await?)
    }

    pub async fn classify_sex(&self, text: &str) -> Result<Option<Sex>> {
        Sex::from_label(&self.sex.label(text).await?)
    }

    /// Classify a post's text, stopping at the first gate that rejects it.
    pub async fn classify(&self, post_id: i64, text: &str) -> Result<Verdict> {
        let Some(species) = self.classify_species(text).await? else {
            info!(post_id, "Species can't be determined");
            return Ok(Verdict::NoSpecies);
        };
        info!(post_id, ?species, "Classified species");

        let Some(card_type) = self.classify_card_type(text).await? else {
            info!(post_id, "Card type can't be determined");
            return Ok(Verdict::NoCardType(species));
        };
        info!(post_id, ?card_type, "Classified card type");

        let sex = self.classify_sex(text).await?;
        info!(post_id, ?sex, "Classified sex");

        Ok(Verdict::Accepted(Classification {
            species,
            card_type,
            sex,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClassifier;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(
        species: &MockClassifier,
        card_type: &MockClassifier,
        sex: &MockClassifier,
    ) -> ClassificationPipeline {
        ClassificationPipeline::new(
            Box::new(species.clone()),
            Box::new(card_type.clone()),
            Box::new(sex.clone()),
        )
    }

    #[tokio::test]
    async fn client_posts_pandas_records_and_reads_first_label() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invocations"))
            .and(header("content-type", RECORDS_CONTENT_TYPE))
            .and(body_json(json!([{"text": "found a dog"}])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["Dog"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ClassifierClient::new(format!("{}/invocations", server.uri()));
        assert_eq!(client.label("found a dog").await.unwrap(), "Dog");
    }

    #[tokio::test]
    async fn client_non_success_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ClassifierClient::new(server.uri());
        let err = client.label("x").await.unwrap_err();
        assert!(matches!(err, CrawlError::Transport(_)));
    }

    #[tokio::test]
    async fn client_empty_array_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = ClassifierClient::new(server.uri());
        assert!(matches!(client.label("x").await, Err(CrawlError::Transport(_))));
    }

    #[tokio::test]
    async fn other_species_stops_before_card_type() {
        let species = MockClassifier::fixed("Other");
        let card_type = MockClassifier::fixed("Lost");
        let sex = MockClassifier::fixed("Male");

        let verdict = pipeline(&species, &card_type, &sex)
            .classify(1, "a parrot flew away")
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::NoSpecies);
        assert_eq!(species.calls(), 1);
        assert_eq!(card_type.calls(), 0);
        assert_eq!(sex.calls(), 0);
    }

    #[tokio::test]
    async fn irrelevant_card_type_stops_before_sex() {
        let species = MockClassifier::fixed("Cat");
        let card_type = MockClassifier::fixed("NotRelevant/Other");
        let sex = MockClassifier::fixed("Female");

        let verdict = pipeline(&species, &card_type, &sex)
            .classify(1, "cat food for sale")
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::NoCardType(Species::Cat));
        assert_eq!(sex.calls(), 0);
    }

    #[tokio::test]
    async fn accepted_post_carries_optional_sex() {
        let species = MockClassifier::fixed("Dog");
        let card_type = MockClassifier::fixed("Found");
        let sex = MockClassifier::fixed("NotDescribed/Other");

        let verdict = pipeline(&species, &card_type, &sex)
            .classify(1, "found a dog")
            .await
            .unwrap();

        assert_eq!(
            verdict,
            Verdict::Accepted(Classification {
                species: Species::Dog,
                card_type: CardType::Found,
                sex: None,
            })
        );
        assert_eq!(sex.calls(), 1);
    }

    #[tokio::test]
    async fn unexpected_label_fails_the_post() {
        let species = MockClassifier::fixed("Hamster");
        let card_type = MockClassifier::fixed("Lost");
        let sex = MockClassifier::fixed("Male");

        let err = pipeline(&species, &card_type, &sex)
            .classify(1, "?")
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::UnexpectedClassifierLabel { .. }));
        assert_eq!(card_type.calls(), 0);
    }
}
