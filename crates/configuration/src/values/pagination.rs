use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bounds on the page size a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSettings {
    /// page size used when a request asks for zero rows
    #[serde(default = "default_page_size_default")]
    pub default_page_size: u32,
    /// largest page size served; bigger requests are cut down to it
    #[serde(default = "max_page_size_default")]
    pub max_page_size: u32,
}

impl PaginationSettings {
    pub fn is_default(&self) -> bool {
        *self == PaginationSettings::default()
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        PaginationSettings {
            default_page_size: 20,
            max_page_size: 1000,
        }
    }
}

fn default_page_size_default() -> u32 {
    PaginationSettings::default().default_page_size
}
fn max_page_size_default() -> u32 {
    PaginationSettings::default().max_page_size
}
