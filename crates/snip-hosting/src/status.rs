use serde::{Deserialize, Serialize};

/// Outcome of one content request, in the vocabulary persisted by the fetch stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    FileNotFound,
    Unauthorized,
    Forbidden,
    EmptyContent,
    InvalidUrl,
    RequestException,
    OtherError,
}

impl FetchStatus {
    pub const ALL: [FetchStatus; 8] = [
        FetchStatus::Success,
        FetchStatus::FileNotFound,
        FetchStatus::Unauthorized,
        FetchStatus::Forbidden,
        FetchStatus::EmptyContent,
        FetchStatus::InvalidUrl,
        FetchStatus::RequestException,
        FetchStatus::OtherError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::FileNotFound => "file_not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::EmptyContent => "empty_content",
            Self::InvalidUrl => "invalid_url",
            Self::RequestException => "request_exception",
            Self::OtherError => "other_error",
        }
    }

    /// Status for a non-success HTTP response.
    pub fn from_http(code: u16) -> Self {
        match code {
            404 => Self::FileNotFound,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            _ => Self::OtherError,
        }
    }
}

/// Decoded content plus the status that produced it. `content` is set only for `Success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl FetchOutcome {
    pub fn success(content: String) -> Self {
        Self {
            status: FetchStatus::Success,
            content: Some(content),
            http_status: Some(200),
        }
    }

    pub fn failed(status: FetchStatus, http_status: Option<u16>) -> Self {
        Self {
            status,
            content: None,
            http_status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::FetchStatus;

    #[test]
    fn http_codes_map_to_fixed_vocabulary() {
        assert_eq!(FetchStatus::from_http(404), FetchStatus::FileNotFound);
        assert_eq!(FetchStatus::from_http(401), FetchStatus::Unauthorized);
        assert_eq!(FetchStatus::from_http(403), FetchStatus::Forbidden);
        assert_eq!(FetchStatus::from_http(502), FetchStatus::OtherError);
    }

    #[test]
    fn serialized_names_match_labels() {
        for status in FetchStatus::ALL {
            let json = serde_json::to_string(&status).expect("serialize");
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
