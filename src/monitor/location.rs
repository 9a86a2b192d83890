use super::LocationPort;
use crate::diagnostics::{Diagnostic, Lookup};
use crate::error::BadgeError;
use crate::model::LocationSnapshot;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Plain HTTP lookup against an ifconfig.co-compatible JSON endpoint.
pub struct HttpLocation {
    client: Client,
    endpoint: String,
}

impl HttpLocation {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BadgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("netbadge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BadgeError::Location(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl LocationPort for HttpLocation {
    fn fetch(&mut self) -> Result<String, BadgeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| BadgeError::Location(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(BadgeError::Location(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }
        response
            .text()
            .map_err(|e| BadgeError::Location(format!("reading body: {e}")))
    }
}

#[derive(Deserialize)]
struct LocationPayload {
    #[serde(default)]
    country_iso: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    asn_org: Option<String>,
}

/// Decode the lookup response. Absent or null fields become empty strings.
pub fn parse_location(body: &str, tick: u64) -> Result<LocationSnapshot, BadgeError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| BadgeError::Payload(e.to_string()))?;
    if !value.is_object() {
        return Err(BadgeError::Payload("expected a JSON object".to_string()));
    }
    let payload =
        LocationPayload::deserialize(value).map_err(|e| BadgeError::Payload(e.to_string()))?;
    Ok(LocationSnapshot {
        country_code: payload.country_iso.unwrap_or_default().trim().to_string(),
        public_ip: payload.ip.unwrap_or_default().trim().to_string(),
        asn_org: payload.asn_org.unwrap_or_default().trim().to_string(),
        fetched_at_tick: tick,
    })
}

/// Caches the last successful location lookup.
pub struct LocationResolver {
    port: Option<Box<dyn LocationPort>>,
    snapshot: LocationSnapshot,
}

impl LocationResolver {
    pub fn new(port: Box<dyn LocationPort>) -> Self {
        Self {
            port: Some(port),
            snapshot: LocationSnapshot::default(),
        }
    }

    /// A resolver that never looks anything up; the snapshot stays unknown.
    pub fn disabled() -> Self {
        Self {
            port: None,
            snapshot: LocationSnapshot::default(),
        }
    }

    /// Use `port` if it could be built. Otherwise run disabled and hand back
    /// the failure as a diagnostic.
    pub fn from_port(
        port: Result<Box<dyn LocationPort>, BadgeError>,
    ) -> (Self, Option<Diagnostic>) {
        match port {
            Ok(port) => (Self::new(port), None),
            Err(e) => (
                Self::disabled(),
                Some(Diagnostic::LookupFailure {
                    lookup: Lookup::Location,
                    reason: e.to_string(),
                }),
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.port.is_some()
    }

    /// Fetch a fresh snapshot. On failure the previous snapshot is kept.
    pub fn fetch(&mut self, tick: u64) -> Result<&LocationSnapshot, BadgeError> {
        if let Some(port) = self.port.as_mut() {
            let body = port.fetch()?;
            self.snapshot = parse_location(&body, tick)?;
        }
        Ok(&self.snapshot)
    }

    pub fn snapshot(&self) -> &LocationSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Canned(VecDeque<Result<&'static str, &'static str>>);

    impl LocationPort for Canned {
        fn fetch(&mut self) -> Result<String, BadgeError> {
            match self.0.pop_front() {
                Some(Ok(body)) => Ok(body.to_string()),
                Some(Err(e)) => Err(BadgeError::Location(e.to_string())),
                None => Err(BadgeError::Location("exhausted".into())),
            }
        }
    }

    #[test]
    fn reads_known_fields() {
        let snap = parse_location(
            r#"{"ip":"203.0.113.7","country_iso":"DE","asn_org":"Hetzner Online GmbH","city":"x"}"#,
            4,
        )
        .unwrap();
        assert_eq!(snap.country_code, "DE");
        assert_eq!(snap.public_ip, "203.0.113.7");
        assert_eq!(snap.asn_org, "Hetzner Online GmbH");
        assert_eq!(snap.fetched_at_tick, 4);
    }

    #[test]
    fn missing_fields_are_empty() {
        let snap = parse_location(r#"{"ip":"203.0.113.7","asn_org":null}"#, 0).unwrap();
        assert_eq!(snap.country_code, "");
        assert_eq!(snap.asn_org, "");
        assert!(!snap.is_unknown());
    }

    #[test]
    fn rejects_non_objects() {
        assert!(parse_location(r#"["DE","1.2.3.4"]"#, 0).is_err());
        assert!(parse_location("<html>", 0).is_err());
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut resolver = LocationResolver::new(Box::new(Canned(VecDeque::from(vec![
            Ok(r#"{"country_iso":"NL","ip":"198.51.100.1"}"#),
            Err("timed out"),
            Ok("not json"),
        ]))));
        let first = resolver.fetch(1).unwrap().clone();
        assert!(resolver.fetch(2).is_err());
        assert_eq!(resolver.snapshot(), &first);
        assert!(resolver.fetch(3).is_err());
        assert_eq!(resolver.snapshot(), &first);
    }

    #[test]
    fn disabled_resolver_stays_unknown() {
        let mut resolver = LocationResolver::disabled();
        assert!(!resolver.is_enabled());
        assert!(resolver.fetch(1).unwrap().is_unknown());
    }

    #[test]
    fn unbuildable_port_falls_back_to_disabled() {
        let (resolver, diagnostic) = LocationResolver::from_port(Err(BadgeError::Location(
            "http client init failed: no TLS backend".into(),
        )));
        assert!(!resolver.is_enabled());
        assert!(resolver.snapshot().is_unknown());
        assert!(matches!(
            diagnostic,
            Some(Diagnostic::LookupFailure {
                lookup: Lookup::Location,
                ..
            })
        ));

        let port: Box<dyn LocationPort> = Box::new(Canned(VecDeque::new()));
        let (resolver, diagnostic) = LocationResolver::from_port(Ok(port));
        assert!(resolver.is_enabled());
        assert!(diagnostic.is_none());
    }
}
