//! Fish identification from a photo.
//!
//! Google Cloud Vision finds objects and labels in the image; the generator
//! turns the best fish candidate into a species, description and
//! conservation status.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use spotfinder_core::secrets::{self, CredentialProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::client::TextGenerator;
use crate::error::{AnalysisError, VisionError};
use crate::prompts;
use crate::structured::request_structured;

const VISION_API_BASE: &str = "https://vision.googleapis.com";
const FISH_TERMS: [&str; 3] = ["fish", "marine", "aquatic"];

/// A localized object from the vision provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectedObject {
    pub name: String,
    #[serde(default)]
    pub score: f32,
}

/// Objects and labels found in one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAnnotations {
    pub objects: Vec<DetectedObject>,
    pub labels: Vec<String>,
}

fn is_fish_term(text: &str) -> bool {
    let lower = text.to_lowercase();
    FISH_TERMS.iter().any(|term| lower.contains(term))
}

/// Image-understanding provider.
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    async fn annotate(&self, image: &[u8]) -> Result<ImageAnnotations, VisionError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest {
    requests: [AnnotateImageRequest; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: ImageContent,
    features: [Feature; 2],
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    localized_object_annotations: Vec<DetectedObject>,
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: String,
}

pub struct VisionClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl VisionClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, VisionError> {
        Self::with_base_url(credentials, VISION_API_BASE)
    }

    pub fn with_base_url(
        credentials: Arc<dyn CredentialProvider>,
        base_url: &str,
    ) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl ImageAnnotator for VisionClient {
    #[instrument(skip(self, image), level = "info", fields(bytes = image.len()))]
    async fn annotate(&self, image: &[u8]) -> Result<ImageAnnotations, VisionError> {
        if image.is_empty() {
            return Err(VisionError::InvalidImage("image is empty".into()));
        }
        let key = self.credentials.credential(secrets::GOOGLE_CLOUD_API_KEY)?;

        let request = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(image),
                },
                features: [
                    Feature {
                        kind: "OBJECT_LOCALIZATION",
                        max_results: 5,
                    },
                    Feature {
                        kind: "LABEL_DETECTION",
                        max_results: 10,
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/images:annotate", self.base_url))
            .query(&[("key", key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                message: secrets::redact(&message, &key),
            });
        }

        let body: AnnotateResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        let first = body.responses.into_iter().next();
        Ok(first
            .map(|r| ImageAnnotations {
                objects: r.localized_object_annotations,
                labels: r.label_annotations.into_iter().map(|l| l.description).collect(),
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishIdentification {
    pub species: String,
    /// Detection score of the chosen object, 0..=1
    pub confidence: f32,
    pub description: String,
    pub conservation_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeciesReply {
    species: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    conservation_status: String,
}

impl SpeciesReply {
    fn validate(&self) -> Result<(), String> {
        if self.species.trim().is_empty() {
            return Err("reply names no species".to_string());
        }
        Ok(())
    }
}

pub struct FishIdentifier {
    annotator: Arc<dyn ImageAnnotator>,
    generator: Arc<dyn TextGenerator>,
}

impl FishIdentifier {
    pub fn new(annotator: Arc<dyn ImageAnnotator>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            annotator,
            generator,
        }
    }

    /// Identify the fish in a JPEG/PNG image.
    ///
    /// Takes the image by value so the buffer is released on every path.
    ///
    /// # Errors
    /// - `Vision(NoObjectsDetected | NoFishDetected)` when nothing fish-like
    ///   is found
    /// - `Vision` / `Provider` for provider failures
    /// - `Malformed` when the species reply doesn't parse
    #[instrument(skip(self, image), level = "info")]
    pub async fn identify(&self, image: Vec<u8>) -> Result<FishIdentification, AnalysisError> {
        let annotations = self.annotator.annotate(&image).await?;
        drop(image);

        if annotations.objects.is_empty() {
            return Err(VisionError::NoObjectsDetected.into());
        }
        let fish = annotations
            .objects
            .iter()
            .find(|obj| is_fish_term(&obj.name))
            .ok_or(VisionError::NoFishDetected)?;

        let labels = annotations
            .labels
            .iter()
            .filter(|label| is_fish_term(label))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        tracing::debug!("Detected {} ({:.2}) with labels [{}]", fish.name, fish.score, labels);

        let reply: SpeciesReply = request_structured(
            self.generator.as_ref(),
            prompts::FISH_ID_SYSTEM,
            &prompts::fish_identification(&fish.name, &labels),
            None,
            SpeciesReply::validate,
        )
        .await?;

        Ok(FishIdentification {
            species: reply.species,
            confidence: fish.score,
            description: reply.description,
            conservation_status: reply.conservation_status,
        })
    }
}

/// Decode a base64 image, accepting an optional `data:<mime>;base64,` prefix.
///
/// # Errors
/// `VisionError::InvalidImage` when the payload is empty or not base64.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, VisionError> {
    let encoded = match payload.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| VisionError::InvalidImage(format!("not base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(VisionError::InvalidImage("image is empty".into()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::testing::ScriptedGenerator;
    use spotfinder_core::StaticCredentials;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedAnnotations(ImageAnnotations);

    #[async_trait]
    impl ImageAnnotator for FixedAnnotations {
        async fn annotate(&self, _image: &[u8]) -> Result<ImageAnnotations, VisionError> {
            Ok(self.0.clone())
        }
    }

    fn object(name: &str, score: f32) -> DetectedObject {
        DetectedObject {
            name: name.to_string(),
            score,
        }
    }

    const SPECIES_REPLY: &str = r#"{
        "species": "Rainbow Trout",
        "description": "Cold-water fish of streams and lakes.",
        "conservationStatus": "Least Concern"
    }"#;

    #[tokio::test]
    async fn test_identify_picks_first_fish_object() {
        let annotations = ImageAnnotations {
            objects: vec![object("Person", 0.98), object("Fish", 0.87), object("Marine animal", 0.6)],
            labels: vec!["Fish".into(), "Water".into(), "Aquatic animal".into()],
        };
        let generator = Arc::new(ScriptedGenerator::replying(SPECIES_REPLY));
        let identifier = FishIdentifier::new(Arc::new(FixedAnnotations(annotations)), generator.clone());

        let result = identifier.identify(vec![1, 2, 3]).await.unwrap();

        assert_eq!(result.species, "Rainbow Trout");
        assert_eq!(result.confidence, 0.87);
        assert_eq!(result.conservation_status, "Least Concern");

        let (system, user) = generator.last_prompt().unwrap();
        assert_eq!(system, prompts::FISH_ID_SYSTEM);
        assert!(user.contains("detected fish (Fish)"));
        assert!(user.contains("labels: Fish, Aquatic animal,"));
    }

    #[tokio::test]
    async fn test_no_objects() {
        let identifier = FishIdentifier::new(
            Arc::new(FixedAnnotations(ImageAnnotations::default())),
            Arc::new(ScriptedGenerator::replying(SPECIES_REPLY)),
        );
        let result = identifier.identify(vec![1]).await;
        assert!(matches!(result, Err(AnalysisError::Vision(VisionError::NoObjectsDetected))));
    }

    #[tokio::test]
    async fn test_no_fish() {
        let generator = Arc::new(ScriptedGenerator::replying(SPECIES_REPLY));
        let identifier = FishIdentifier::new(
            Arc::new(FixedAnnotations(ImageAnnotations {
                objects: vec![object("Boat", 0.9)],
                labels: vec![],
            })),
            generator.clone(),
        );

        let result = identifier.identify(vec![1]).await;

        assert!(matches!(result, Err(AnalysisError::Vision(VisionError::NoFishDetected))));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_species_reply() {
        let identifier = FishIdentifier::new(
            Arc::new(FixedAnnotations(ImageAnnotations {
                objects: vec![object("Fish", 0.9)],
                labels: vec![],
            })),
            Arc::new(ScriptedGenerator::replying("Looks like a trout to me!")),
        );
        let result = identifier.identify(vec![1]).await;
        assert!(matches!(result, Err(AnalysisError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_vision_client_request_shape() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .and(query_param("key", "cloud-key"))
            .and(body_partial_json(serde_json::json!({
                "requests": [{
                    "image": {"content": "AQID"},
                    "features": [
                        {"type": "OBJECT_LOCALIZATION", "maxResults": 5},
                        {"type": "LABEL_DETECTION", "maxResults": 10}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{
                    "localizedObjectAnnotations": [{"name": "Fish", "score": 0.91}],
                    "labelAnnotations": [{"description": "Fish"}, {"description": "Fin"}]
                }]
            })))
            .mount(&mock_server)
            .await;

        let creds = Arc::new(StaticCredentials::new().with(secrets::GOOGLE_CLOUD_API_KEY, "cloud-key"));
        let client = VisionClient::with_base_url(creds, &mock_server.uri()).unwrap();
        let annotations = client.annotate(&[1, 2, 3]).await.unwrap();

        assert_eq!(annotations.objects, vec![object("Fish", 0.91)]);
        assert_eq!(annotations.labels, vec!["Fish".to_string(), "Fin".to_string()]);
    }

    #[tokio::test]
    async fn test_vision_client_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API not enabled"))
            .mount(&mock_server)
            .await;

        let creds = Arc::new(StaticCredentials::new().with(secrets::GOOGLE_CLOUD_API_KEY, "k"));
        let client = VisionClient::with_base_url(creds, &mock_server.uri()).unwrap();
        let result = client.annotate(&[1]).await;
        assert!(matches!(result, Err(VisionError::Status { status: 403, .. })));
    }

    #[test]
    fn test_decode_image_with_and_without_prefix() {
        assert_eq!(decode_image("AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_image("data:image/jpeg;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert!(matches!(decode_image("not base64!"), Err(VisionError::InvalidImage(_))));
        assert!(matches!(decode_image(""), Err(VisionError::InvalidImage(_))));
    }
}
