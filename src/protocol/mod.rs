//! Wire-level building blocks for the smart HTTP protocol: service types, pkt-line
//! framing, and detection of git errors embedded in successful HTTP responses.

pub mod error_detect;
pub mod pkt_line;

use std::fmt;
use std::str::FromStr;

use crate::errors::TransportError;

/// Git service types for the smart protocol.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ServiceType {
    UploadPack,
    ReceivePack,
}

impl ServiceType {
    /// Path segment of the POST endpoint for this service.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ServiceType::UploadPack => "git-upload-pack",
            ServiceType::ReceivePack => "git-receive-pack",
        }
    }

    /// Content type for the request body POSTed to this service.
    pub fn request_content_type(&self) -> &'static str {
        match self {
            ServiceType::UploadPack => "application/x-git-upload-pack-request",
            ServiceType::ReceivePack => "application/x-git-receive-pack-request",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for ServiceType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git-upload-pack" => Ok(ServiceType::UploadPack),
            "git-receive-pack" => Ok(ServiceType::ReceivePack),
            _ => Err(TransportError::InvalidService(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_round_trips_through_str() {
        assert_eq!(
            "git-upload-pack".parse::<ServiceType>().unwrap(),
            ServiceType::UploadPack
        );
        assert_eq!(
            "git-receive-pack".parse::<ServiceType>().unwrap(),
            ServiceType::ReceivePack
        );
        assert_eq!(ServiceType::UploadPack.to_string(), "git-upload-pack");
        assert_eq!(ServiceType::ReceivePack.to_string(), "git-receive-pack");
    }

    #[test]
    fn unknown_service_is_rejected() {
        let err = "git-archive".parse::<ServiceType>().unwrap_err();
        assert!(matches!(err, TransportError::InvalidService(_)));
    }

    #[test]
    fn content_types_match_service() {
        assert_eq!(
            ServiceType::UploadPack.request_content_type(),
            "application/x-git-upload-pack-request"
        );
        assert_eq!(
            ServiceType::ReceivePack.request_content_type(),
            "application/x-git-receive-pack-request"
        );
    }
}
