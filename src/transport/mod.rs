//! The HTTP transport (spec §4.G): institution discovery, cookie-based login,
//! and GWT-RPC calls over `reqwest`.

pub mod permutations;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use failsafe::{CircuitBreaker, Config as CircuitConfig};
use reqwest::header;
use scraper::{Html, Selector};
use slog::Logger;
use tokio_util::sync::CancellationToken;

use crate::domain::ContainerKind;
use crate::error::TransportError;

/// RPC default (§5 "Timeouts").
const RPC_TIMEOUT: Duration = Duration::from_secs(15);
/// Signed file-URL lookups are grouped under "file download" in the timeout table.
const FILE_TIMEOUT: Duration = Duration::from_secs(60);
/// Each of the two `doLogin` round-trips, and the institution-discovery GET.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    school: String,
    logged_in: AtomicBool,
    cancel: CancellationToken,
    logger: Logger,
}

impl Transport {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>, school: impl Into<String>, logger: Logger) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Transport {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            school: school.into(),
            logged_in: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            logger: logger.new(slog::o!("subsystem" => "transport")),
        })
    }

    /// A clone of the token every in-flight operation races against; calling
    /// `.cancel()` on it abandons every outstanding request with `TransportError::Cancelled`.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Races `fut` against `deadline` and against cancellation, the way
    /// §5 "Cancellation" requires every I/O operation to (SPEC_FULL.md §A "Resilience").
    async fn with_deadline<T>(&self, deadline: Duration, fut: impl Future<Output = Result<T, TransportError>>) -> Result<T, TransportError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = tokio::time::timeout(deadline, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(TransportError::Timeout),
            },
        }
    }

    /// Scrapes the institution list embedded in a `<script>` tag on the
    /// landing page, the way `pjatk.rs`'s `ASPEmulator` pulls hidden form
    /// state out of HTML (§4.G, SPEC_FULL.md §A).
    pub async fn discover_institution(&self, name: &str) -> Result<String, TransportError> {
        let body = self.with_deadline(LOGIN_TIMEOUT, async { Ok(self.client.get(&self.base_url).send().await?.text().await?) }).await?;
        let document = Html::parse_document(&body);
        let selector = Selector::parse("script").expect("static selector is valid");

        for script in document.select(&selector) {
            let text: String = script.text().collect();
            let Some(start) = text.find("JSON.parse('") else { continue };
            let after = &text[start + "JSON.parse('".len()..];
            let Some(end) = after.find("');") else { continue };
            let raw = after[..end].replace('\\', "");

            let Ok(schools) = serde_json::from_str::<Vec<serde_json::Value>>(&raw) else { continue };
            for school in schools {
                if school.get("navn").and_then(|v| v.as_str()) == Some(name) {
                    if let Some(instnr) = school.get("instnr").and_then(|v| v.as_str()) {
                        return Ok(instnr.to_string());
                    }
                }
            }
        }

        Err(TransportError::SchoolNotFound { name: name.to_string() })
    }

    /// Two-step cookie login, retried up to 3 times with a fixed 1s backoff
    /// behind a circuit breaker that fails fast once logins stop succeeding
    /// (SPEC_FULL.md §A "Resilience").
    pub async fn login(&self) -> Result<(), TransportError> {
        if self.logged_in.load(Ordering::Acquire) {
            return Ok(());
        }

        let instnr = self.discover_institution(&self.school).await?;
        let circuit = CircuitConfig::new().build();

        let mut last_err = TransportError::AuthFailed;
        for attempt in 1..=3u32 {
            if !circuit.is_call_permitted() {
                return Err(TransportError::StaleHashes);
            }

            match self.login_once(&instnr).await {
                Ok(()) => {
                    circuit.on_success();
                    self.logged_in.store(true, Ordering::Release);
                    return Ok(());
                }
                Err(err) => {
                    circuit.on_error();
                    slog::warn!(self.logger, "login attempt failed"; "attempt" => attempt);
                    last_err = err;
                    if attempt < 3 {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        Err(last_err)
    }

    async fn login_once(&self, instnr: &str) -> Result<(), TransportError> {
        self.with_deadline(LOGIN_TIMEOUT, async {
            self.client
                .post(format!("{}/login/doLogin", self.base_url))
                .form(&[("instnr", instnr), ("acr_values", ""), ("how", "DIREKTE")])
                .send()
                .await?;
            Ok(())
        })
        .await?;

        let response = self
            .with_deadline(LOGIN_TIMEOUT, async {
                Ok(self
                    .client
                    .post(format!("{}/login/doLogin", self.base_url))
                    .form(&[("instnr", instnr), ("user", self.username.as_str()), ("pass", self.password.as_str()), ("how", "DIREKTE")])
                    .send()
                    .await?)
            })
            .await?;

        let landed_on = response.url().as_str().to_string();
        if landed_on.contains("skema") || landed_on.contains("forside") {
            Ok(())
        } else {
            Err(TransportError::AuthFailed)
        }
    }

    async fn rpc_call(&self, service_path: &str, permutation: &str, module: &str, body: String, deadline: Duration) -> Result<String, TransportError> {
        self.login().await?;

        self.with_deadline(deadline, async {
            let response = self
                .client
                .post(format!("{}{}", self.base_url, service_path))
                .header(header::CONTENT_TYPE, "text/x-gwt-rpc; charset=UTF-8")
                .header("X-GWT-Permutation", permutation)
                .header("X-GWT-Module-Base", format!("{}/{module}/{module}/", self.base_url))
                .header("modulename", module)
                .body(body)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(TransportError::HttpStatus { code: response.status().as_u16() });
            }
            Ok(response.text().await?)
        })
        .await
    }

    pub async fn fetch_schedule(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String, TransportError> {
        let body = format!(
            "7|0|6|{base}{module_base}|{hash}|dk.uddata.services.interfaces.SkemaService|hentEgnePersSkemaData|dk.uddata.gwt.comm.shared.UDate/2314285719|UDate:|1|2|3|4|2|5|5|{start_enc}{end_enc}",
            base = self.base_url,
            module_base = permutations::SKEMA_MODULE_BASE,
            hash = permutations::SKEMA_SERVICE_HASH,
            start_enc = encode_date(start),
            end_enc = encode_date(end),
        );
        self.rpc_call(permutations::SKEMA_SERVICE_PATH, permutations::SKEMA_PERMUTATION, "skema", body, RPC_TIMEOUT).await
    }

    pub async fn fetch_assignments(&self) -> Result<String, TransportError> {
        let body = format!(
            "7|0|4|{base}{module_base}|{hash}|dk.uddata.services.interfaces.OpgaveService|getAlleAfleveringer|1|2|3|4|0|",
            base = self.base_url,
            module_base = permutations::OPGAVE_MODULE_BASE,
            hash = permutations::OPGAVE_SERVICE_HASH,
        );
        self.rpc_call(permutations::OPGAVE_SERVICE_PATH, permutations::OPGAVE_PERMUTATION, "opgave", body, RPC_TIMEOUT).await
    }

    pub async fn fetch_assignment_detail(&self, aflevering_id: i64) -> Result<String, TransportError> {
        let body = format!(
            "7|0|5|{base}{module_base}|{hash}|dk.uddata.services.interfaces.OpgaveService|getAflevering|I|1|2|3|4|1|5|{id}|",
            base = self.base_url,
            module_base = permutations::OPGAVE_MODULE_BASE,
            hash = permutations::OPGAVE_SERVICE_HASH,
            id = aflevering_id,
        );
        self.rpc_call(permutations::OPGAVE_SERVICE_PATH, permutations::OPGAVE_PERMUTATION, "opgave", body, RPC_TIMEOUT).await
    }

    /// Lighter-weight probe used purely to learn whether a lesson has files
    /// attached, without paying for a full note fetch (SPEC_FULL.md §B.5).
    pub async fn probe_lesson_note(&self, skema_id: i64) -> Result<String, TransportError> {
        let body = format!(
            "7|0|5|{base}{module_base}|{hash}|dk.uddata.services.interfaces.SkemaNote2Service|hentNoteForSkema|I|1|2|3|4|1|5|{id}|",
            base = self.base_url,
            module_base = permutations::SKEMA_MODULE_BASE,
            hash = permutations::SKEMA_NOTE_SERVICE_HASH,
            id = skema_id,
        );
        self.rpc_call(permutations::SKEMA_NOTE_SERVICE_PATH, permutations::SKEMA_PERMUTATION, "skema", body, RPC_TIMEOUT).await
    }

    pub async fn list_files(&self, container_id: i64, kind: ContainerKind) -> Result<String, TransportError> {
        let container_type = match kind {
            ContainerKind::Lesson => permutations::CONTAINER_TYPE_SKEMA,
            ContainerKind::Assignment => permutations::CONTAINER_TYPE_OPGAVE,
        };
        let body = format!(
            "7|0|6|{base}{module_base}|{hash}|dk.uddata.services.interfaces.RessourceService|findRessourcerPerContainer|dk.uddata.model.ressourcer.RessourceKey/785242658|dk.uddata.model.ressourcer.RessourceObjektType/3745084519|1|2|3|4|1|5|5|{container_id}|6|{container_type}|",
            base = self.base_url,
            module_base = permutations::SKEMA_MODULE_BASE,
            hash = permutations::RESSOURCE_SERVICE_HASH,
        );
        self.rpc_call(permutations::RESSOURCE_SERVICE_PATH, permutations::SKEMA_PERMUTATION, "skema", body, RPC_TIMEOUT).await
    }

    pub async fn fetch_file_url(&self, file_id: i64) -> Result<String, TransportError> {
        let body = format!(
            "7|0|7|{base}{module_base}|{hash}|dk.uddata.services.interfaces.RessourceService|hentRessourceUrl|I|java.lang.String/2004016611||1|2|3|4|2|5|6|{file_id}|7|",
            base = self.base_url,
            module_base = permutations::SKEMA_MODULE_BASE,
            hash = permutations::RESSOURCE_SERVICE_HASH,
        );
        self.rpc_call(permutations::RESSOURCE_SERVICE_PATH, permutations::SKEMA_PERMUTATION, "skema", body, FILE_TIMEOUT).await
    }
}

fn encode_date(dt: DateTime<Utc>) -> String {
    format!("5|6|{}|{}|{}|0|0|0|", dt.year() - 1900, dt.month() - 1, dt.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encodes_date_with_year_offset_from_1900() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(encode_date(dt), "5|6|126|2|5|0|0|0|");
    }
}
