//! XML bodies of the DNS-master API
//!
//! Every response shares one envelope: a status string, an optional error
//! list, and a data section listing zones with their records. Only the
//! fields the solver needs are decoded; anything else is ignored.

use dns01_core::traits::{ResourceRecord, Zone};
use dns01_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Status value of a successful response
pub const STATUS_SUCCESS: &str = "success";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>"#;

/// Record creation request
#[derive(Debug, Serialize)]
#[serde(rename = "request")]
pub struct RecordRequest {
    #[serde(rename = "rr-list")]
    rr_list: RrList,
}

#[derive(Debug, Serialize)]
struct RrList {
    rr: Vec<RrOut>,
}

#[derive(Debug, Serialize)]
struct RrOut {
    name: String,
    ttl: u32,
    #[serde(rename = "type")]
    record_type: String,
    txt: TxtOut,
}

#[derive(Debug, Serialize)]
struct TxtOut {
    string: String,
}

impl RecordRequest {
    /// Request carrying a single record
    pub fn single(record: &ResourceRecord) -> Self {
        Self {
            rr_list: RrList {
                rr: vec![RrOut {
                    name: record.name.clone(),
                    ttl: record.ttl,
                    record_type: record.record_type.clone(),
                    txt: TxtOut {
                        string: record.payload.clone(),
                    },
                }],
            },
        }
    }

    /// Serialize with the XML declaration
    pub fn to_xml(&self) -> Result<String> {
        let body = quick_xml::se::to_string(self)
            .map_err(|e| Error::protocol("encode request", e.to_string()))?;
        Ok(format!("{}{}", XML_DECLARATION, body))
    }
}

/// Response envelope
#[derive(Debug, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    errors: Option<ErrorList>,
    #[serde(default)]
    data: Option<Data>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorList {
    #[serde(rename = "error", default)]
    items: Vec<ProviderError>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(rename = "@code", default)]
    code: String,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Data {
    #[serde(rename = "zone", default)]
    zones: Vec<ZoneXml>,
}

#[derive(Debug, Default, Deserialize)]
struct ZoneXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@service", default)]
    service: String,
    #[serde(rename = "rr", default)]
    records: Vec<RrXml>,
}

#[derive(Debug, Default, Deserialize)]
struct RrXml {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ttl: String,
    #[serde(rename = "type", default)]
    record_type: String,
    #[serde(default)]
    txt: Option<TxtXml>,
}

#[derive(Debug, Default, Deserialize)]
struct TxtXml {
    #[serde(default)]
    string: String,
}

impl Response {
    /// Parse a response body
    ///
    /// `operation` names the API call in error messages.
    pub fn parse(operation: &str, body: &str) -> Result<Self> {
        quick_xml::de::from_str(body).map_err(|e| {
            Error::protocol(operation, format!("malformed XML ({}): {}", e, body))
        })
    }

    /// Fail unless the provider status is exactly "success"
    pub fn ensure_success(self, operation: &str) -> Result<Self> {
        if self.status == STATUS_SUCCESS {
            return Ok(self);
        }

        let details = self.error_summary();
        let message = if details.is_empty() {
            format!("provider status '{}'", self.status)
        } else {
            format!("provider status '{}': {}", self.status, details)
        };
        Err(Error::protocol(operation, message))
    }

    /// Provider error codes and texts, joined for diagnostics
    pub fn error_summary(&self) -> String {
        self.errors
            .as_ref()
            .map(|list| {
                list.items
                    .iter()
                    .map(|e| format!("[{}] {}", e.code, e.text.trim()))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default()
    }

    /// Zones in response order
    pub fn into_zones(self) -> Vec<Zone> {
        self.data
            .map(|d| d.zones)
            .unwrap_or_default()
            .into_iter()
            .map(ZoneXml::into_zone)
            .collect()
    }
}

impl ZoneXml {
    fn into_zone(self) -> Zone {
        Zone {
            name: self.name,
            service: self.service,
            records: self.records.into_iter().map(RrXml::into_record).collect(),
        }
    }
}

impl RrXml {
    fn into_record(self) -> ResourceRecord {
        ResourceRecord {
            id: self.id,
            name: self.name,
            ttl: self.ttl.trim().parse().unwrap_or(0),
            record_type: self.record_type,
            payload: self.txt.map(|t| t.string).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request_shape() {
        let record = ResourceRecord::txt("_acme-challenge.example.com.", 60, "abc123");
        let xml = RecordRequest::single(&record).to_xml().unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" ?>"#));
        assert!(xml.contains(
            "<request><rr-list><rr><name>_acme-challenge.example.com.</name>\
             <ttl>60</ttl><type>TXT</type><txt><string>abc123</string></txt>\
             </rr></rr-list></request>"
        ));
    }

    #[test]
    fn test_record_request_escapes_payload() {
        let record = ResourceRecord::txt("x", 60, "a<b&c");
        let xml = RecordRequest::single(&record).to_xml().unwrap();
        assert!(xml.contains("<string>a&lt;b&amp;c</string>"));
    }

    #[test]
    fn test_parse_zone_listing() {
        let body = r#"<?xml version="1.0" encoding="UTF-8" ?>
<response>
  <status>success</status>
  <data>
    <zone admin="123/NIC-REG" enable="true" has-changes="false" id="228095" name="example.com" service="EXAMPLE-SVC"/>
    <zone admin="123/NIC-REG" enable="true" has-changes="true" id="228096" name="example.org" service="OTHER-SVC"/>
  </data>
</response>"#;

        let zones = Response::parse("list zones", body)
            .unwrap()
            .ensure_success("list zones")
            .unwrap()
            .into_zones();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].name, "example.com");
        assert_eq!(zones[0].service, "EXAMPLE-SVC");
        assert!(zones[0].records.is_empty());
        assert_eq!(zones[1].service, "OTHER-SVC");
    }

    #[test]
    fn test_parse_record_listing() {
        let body = r#"<response>
  <status>success</status>
  <data>
    <zone id="228095" name="example.com" service="EXAMPLE-SVC" has-changes="true">
      <rr id="210074"><name>_acme-challenge</name><idn-name>_acme-challenge</idn-name><ttl>60</ttl><type>TXT</type><txt><string>abc123</string></txt></rr>
      <rr id="210075"><name>www</name><ttl>3600</ttl><type>A</type><a>192.0.2.1</a></rr>
    </zone>
  </data>
</response>"#;

        let zones = Response::parse("list records", body).unwrap().into_zones();

        assert_eq!(zones.len(), 1);
        let records = &zones[0].records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "210074");
        assert_eq!(records[0].name, "_acme-challenge");
        assert_eq!(records[0].ttl, 60);
        assert_eq!(records[0].record_type, "TXT");
        assert_eq!(records[0].payload, "abc123");
        assert_eq!(records[1].record_type, "A");
        assert_eq!(records[1].payload, "");
    }

    #[test]
    fn test_failed_status_carries_provider_errors() {
        let body = r#"<response>
  <status>fail</status>
  <errors><error code="4097">Access token is invalid</error></errors>
</response>"#;

        let result = Response::parse("commit", body)
            .unwrap()
            .ensure_success("commit");

        match result {
            Err(Error::Protocol { operation, message }) => {
                assert_eq!(operation, "commit");
                assert!(message.contains("fail"));
                assert!(message.contains("4097"));
                assert!(message.contains("Access token is invalid"));
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_status_is_failure() {
        let response = Response::parse("commit", "<response></response>").unwrap();
        assert!(response.ensure_success("commit").is_err());
    }

    #[test]
    fn test_malformed_xml_is_protocol_error() {
        let result = Response::parse("list zones", "<response><status>success");
        assert!(matches!(result, Err(Error::Protocol { .. })));
    }
}
