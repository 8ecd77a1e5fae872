use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Body of `GET /metadata/{identifier}`. Only the file listing is modelled;
/// unknown items answer `{}` which decodes to an empty listing.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ManifestFile {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "size_from_number_or_string")]
    pub size: u64,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ManifestFile {
    /// Entries without a name or with zero size never count as content.
    pub fn is_listable(&self) -> bool {
        !self.name.is_empty() && self.size > 0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Number(u64),
    Text(String),
}

fn size_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawSize::Number(value)) => Ok(value),
        Some(RawSize::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(0);
            }
            text.parse::<u64>()
                .map_err(|_| de::Error::custom(format!("invalid file size: {text:?}")))
        }
    }
}
