use std::{fmt::Display, str::FromStr, time::Duration};

use lpg_common::Points;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------    AccrualStatus     ---------------------------------------------------------
/// The processing state of an order as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// The order is known to the service, but no calculation has started.
    Registered,
    /// The accrual is being calculated.
    Processing,
    /// The order will never earn points.
    Invalid,
    /// The calculation is complete and the accrual is final.
    Processed,
}

impl AccrualStatus {
    /// `PROCESSED` and `INVALID` are final; no further queries are needed for the order.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown accrual status: {0}")]
pub struct AccrualStatusError(String);

impl FromStr for AccrualStatus {
    type Err = AccrualStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(AccrualStatusError(s.to_string())),
        }
    }
}

//--------------------------------------   AccrualResponse    ---------------------------------------------------------
/// A successfully decoded accrual record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    /// Zero unless the service has reported points for the order.
    pub accrual: Points,
}

/// The JSON body exactly as the service sends it. `order` and `accrual` are frequently omitted.
#[derive(Debug, Deserialize)]
pub(crate) struct AccrualResponseBody {
    pub order: Option<String>,
    pub status: String,
    pub accrual: Option<f64>,
}

impl AccrualResponseBody {
    /// Validates the wire body for the order that was asked about. The error string is used as the
    /// [`AccrualOutcome::MalformedResponse`] reason.
    pub(crate) fn into_response(self, requested: &str) -> Result<AccrualResponse, String> {
        let order = match self.order {
            Some(o) if o != requested => return Err(format!("asked about order {requested} but got a reply for {o}")),
            Some(o) => o,
            None => requested.to_string(),
        };
        let status = self.status.parse::<AccrualStatus>().map_err(|e| e.to_string())?;
        let accrual = match self.accrual {
            Some(v) => Points::try_from_f64(v).map_err(|e| e.to_string())?,
            None => Points::default(),
        };
        Ok(AccrualResponse { order, status, accrual })
    }
}

//--------------------------------------    AccrualOutcome    ---------------------------------------------------------
/// Classification of a single answered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// 200 with a valid JSON record.
    Accrual(AccrualResponse),
    /// 204: the service has no record for the order yet.
    NoContent,
    /// 429: the caller must wait `retry_after` before asking again.
    TooManyRequests { retry_after: Duration },
    /// 500: the service is broken.
    InternalError,
    /// 200 whose body cannot be trusted (wrong content type, bad JSON, unknown status, negative accrual...).
    MalformedResponse(String),
    /// Any other HTTP status code.
    UnexpectedStatus(u16),
}

impl AccrualOutcome {
    /// Outcomes that make further queries pointless. Decided by HTTP semantics only.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InternalError | Self::MalformedResponse(_) | Self::UnexpectedStatus(_))
    }
}

impl Display for AccrualOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accrual(r) => write!(f, "order {} is {} with accrual {}", r.order, r.status, r.accrual),
            Self::NoContent => write!(f, "no accrual record yet"),
            Self::TooManyRequests { retry_after } => write!(f, "rate limited for {}s", retry_after.as_secs()),
            Self::InternalError => write!(f, "accrual service internal error"),
            Self::MalformedResponse(reason) => write!(f, "malformed accrual response: {reason}"),
            Self::UnexpectedStatus(code) => write!(f, "unexpected HTTP status {code} from accrual service"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body(json: &str) -> AccrualResponseBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn status_strings() {
        for s in ["REGISTERED", "PROCESSING", "INVALID", "PROCESSED"] {
            assert_eq!(s.parse::<AccrualStatus>().unwrap().to_string(), s);
        }
        assert!("processed".parse::<AccrualStatus>().is_err());
        assert!(AccrualStatus::Processed.is_terminal());
        assert!(AccrualStatus::Invalid.is_terminal());
        assert!(!AccrualStatus::Registered.is_terminal());
        assert!(!AccrualStatus::Processing.is_terminal());
    }

    #[test]
    fn full_body() {
        let r = body(r#"{"order":"12345678903","status":"PROCESSED","accrual":500}"#)
            .into_response("12345678903")
            .unwrap();
        assert_eq!(r.order, "12345678903");
        assert_eq!(r.status, AccrualStatus::Processed);
        assert_eq!(r.accrual, Points::from_points(500));
    }

    #[test]
    fn sparse_body() {
        let r = body(r#"{"status":"INVALID","accrual":0}"#).into_response("79927398713").unwrap();
        assert_eq!(r.order, "79927398713");
        assert_eq!(r.status, AccrualStatus::Invalid);
        assert!(r.accrual.is_zero());
        let r = body(r#"{"order":"79927398713","status":"REGISTERED"}"#).into_response("79927398713").unwrap();
        assert!(r.accrual.is_zero());
    }

    #[test]
    fn untrustworthy_bodies() {
        let err = body(r#"{"order":"1","status":"PROCESSED","accrual":5}"#).into_response("2").unwrap_err();
        assert!(err.contains("asked about order 2"));
        let err = body(r#"{"status":"DONE"}"#).into_response("2").unwrap_err();
        assert!(err.contains("DONE"));
        let err = body(r#"{"status":"PROCESSED","accrual":-5}"#).into_response("2").unwrap_err();
        assert!(err.contains("negative"));
    }

    #[test]
    fn fatal_outcomes() {
        assert!(AccrualOutcome::InternalError.is_fatal());
        assert!(AccrualOutcome::MalformedResponse("x".into()).is_fatal());
        assert!(AccrualOutcome::UnexpectedStatus(404).is_fatal());
        assert!(!AccrualOutcome::NoContent.is_fatal());
        assert!(!AccrualOutcome::TooManyRequests { retry_after: Duration::from_secs(1) }.is_fatal());
    }
}
