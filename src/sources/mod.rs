use crate::errors::SourceError;

pub mod adc;
pub mod metadata;

use adc::AdcSource;
use metadata::{AccessToken, MetadataSource};

pub const SOURCE_METADATA: &str = "metadata";
pub const SOURCE_ADC: &str = "adc";

#[derive(Debug, Clone)]
pub enum SourceKind {
    Metadata(MetadataSource),
    Adc(AdcSource),
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Metadata(_) => SOURCE_METADATA,
            SourceKind::Adc(_) => SOURCE_ADC,
        }
    }

    pub async fn fetch_identity_token(&self, audience: &str) -> Result<String, SourceError> {
        match self {
            SourceKind::Metadata(s) => s.fetch_identity_token(audience).await,
            SourceKind::Adc(s) => s.fetch_identity_token(audience).await,
        }
    }

    pub async fn fetch_access_token(&self) -> Result<AccessToken, SourceError> {
        match self {
            SourceKind::Metadata(s) => s.fetch_access_token().await,
            SourceKind::Adc(s) => s.fetch_access_token().await,
        }
    }
}
