//! The explicit `Context` replacing the source's module-wide cache and
//! module-wide logger (spec §9 "Global-ish state"): constructed once at
//! startup and threaded to whatever needs the transport, the domain API, or
//! a child logger.

use slog::Logger;

use crate::config::Config;
use crate::domain::api::DomainApi;
use crate::error::TransportError;
use crate::transport::Transport;

pub struct Runtime {
    pub domain: DomainApi,
    pub logger: Logger,
}

impl Runtime {
    pub fn new(config: &Config, logger: Logger) -> Result<Runtime, TransportError> {
        let transport_logger = logger.new(slog::o!());
        let transport = Transport::new(config.base_url(), &config.username, &config.password, &config.school, transport_logger)?;
        let domain = DomainApi::new(transport, logger.new(slog::o!()));
        Ok(Runtime { domain, logger })
    }
}
