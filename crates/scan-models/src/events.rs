use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Common header carried by every detection event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    pub timestamp_ms: u64,
    pub source: String,
}

/// Tagged variant covering every kind of event the router and analyzer can
/// raise for a given frame. Modeled as a flat enum rather than an
/// inheritance hierarchy, matching the event dispatch shape used elsewhere
/// in this codebase for tagged job/event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionEvent {
    ObjectDetected {
        header: EventHeader,
        detections: Vec<Detection>,
    },
    BarcodeDetected {
        header: EventHeader,
        value: String,
        symbology: String,
    },
    DocumentDetected {
        header: EventHeader,
        text: String,
    },
    Throttled {
        header: EventHeader,
        reason: String,
    },
}

impl DetectionEvent {
    pub fn header(&self) -> &EventHeader {
        match self {
            DetectionEvent::ObjectDetected { header, .. } => header,
            DetectionEvent::BarcodeDetected { header, .. } => header,
            DetectionEvent::DocumentDetected { header, .. } => header,
            DetectionEvent::Throttled { header, .. } => header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = DetectionEvent::Throttled {
            header: EventHeader {
                timestamp_ms: 42,
                source: "barcode".to_string(),
            },
            reason: "min_interval_not_elapsed".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "throttled");
        assert_eq!(json["reason"], "min_interval_not_elapsed");
    }
}
