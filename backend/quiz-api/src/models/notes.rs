use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upload of a lecture-notes PDF, base64 encoded.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadNotesRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,

    #[validate(length(min = 1, message = "PDF payload must not be empty"))]
    pub pdf_base64: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SelectAnswerRequest {
    #[validate(range(max = 3, message = "Option index must be between 0 and 3"))]
    pub option_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTarget {
    Idle,
    Dashboard,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigateRequest {
    pub target: NavigationTarget,
}
