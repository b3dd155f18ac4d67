//! Hub: the single serialized access path to one Modbus gateway.
//!
//! The gateway answers one request at a time, so every register access goes
//! through [`Hub::session`], which holds the transport lock for the whole
//! multi-register command. Inside a session each request is paced by the
//! configured inter-message delay and retried on connection faults with
//! bounded exponential backoff, reconnecting in between.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use thermohub_domain::error::{ConnectionError, ThermoHubError};
use thermohub_domain::register::{Codec, Field, NUMBER_OF_DEVICES};

use crate::ports::RegisterTransport;

/// Retry settings for connection faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given failed attempt (one-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

struct Link<T> {
    transport: T,
    last_request: Option<Instant>,
}

/// Owner of the transport to one gateway.
pub struct Hub<T> {
    name: String,
    link: Mutex<Link<T>>,
    policy: RetryPolicy,
    message_delay: Duration,
}

impl<T: RegisterTransport> Hub<T> {
    /// Wrap a transport. No connection is made until the first request.
    pub fn new(
        name: impl Into<String>,
        transport: T,
        policy: RetryPolicy,
        message_delay: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            link: Mutex::new(Link {
                transport,
                last_request: None,
            }),
            policy,
            message_delay,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take exclusive use of the gateway until the session is dropped.
    pub async fn session(&self) -> HubSession<'_, T> {
        HubSession {
            hub: self,
            link: self.link.lock().await,
        }
    }

    /// Read raw holding registers in a one-request session.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Connection`] once retries are exhausted, or
    /// [`ThermoHubError::Protocol`] on a device exception.
    pub async fn read(&self, address: u16, count: u16) -> Result<Vec<u16>, ThermoHubError> {
        self.session().await.read(address, count).await
    }

    /// Count the devices behind the gateway.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`HubSession::read_field`].
    #[tracing::instrument(skip(self), fields(hub = %self.name))]
    pub async fn health_check(&self) -> Result<u8, ThermoHubError> {
        self.session().await.read_field(&NUMBER_OF_DEVICES).await
    }

    /// Close the transport. Waits for the running session to finish.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error.
    pub async fn close(&self) -> Result<(), ThermoHubError> {
        let mut link = self.link.lock().await;
        if !link.transport.is_connected() {
            return Ok(());
        }
        tracing::info!(hub = %self.name, "closing modbus connection");
        link.transport.close().await
    }
}

/// Exclusive access to a hub's transport.
pub struct HubSession<'a, T> {
    hub: &'a Hub<T>,
    link: MutexGuard<'a, Link<T>>,
}

impl<T: RegisterTransport> HubSession<'_, T> {
    /// Read `count` holding registers at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Exhausted`] once every attempt failed on a
    /// connection fault; any other error is returned on first occurrence.
    pub async fn read(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ThermoHubError> {
        let mut attempt = 1;
        loop {
            self.prepare().await;
            let result = match self.ensure_connected().await {
                Ok(()) => {
                    self.link
                        .transport
                        .read_holding_registers(address, count)
                        .await
                }
                Err(err) => Err(err),
            };
            self.link.last_request = Some(Instant::now());
            match result {
                Ok(words) => return Ok(words),
                Err(err) => self.recover(err, &mut attempt, address).await?,
            }
        }
    }

    /// Write `words` at `address`; returns once the device acknowledged.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub async fn write(&mut self, address: u16, words: &[u16]) -> Result<(), ThermoHubError> {
        let mut attempt = 1;
        loop {
            self.prepare().await;
            let result = match self.ensure_connected().await {
                Ok(()) => self.link.transport.write_registers(address, words).await,
                Err(err) => Err(err),
            };
            self.link.last_request = Some(Instant::now());
            match result {
                Ok(()) => {
                    tracing::debug!(address, count = words.len(), "registers written");
                    return Ok(());
                }
                Err(err) => self.recover(err, &mut attempt, address).await?,
            }
        }
    }

    /// Read and decode one field.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`read`](Self::read), or
    /// [`ThermoHubError::Protocol`] if the content does not decode.
    pub async fn read_field<C: Codec>(&mut self, field: &Field<C>) -> Result<C::Value, ThermoHubError> {
        let words = self.read(field.address, field.count()).await?;
        field.decode(&words).map_err(|err| {
            tracing::debug!(
                field = field.name,
                address = field.address,
                ?words,
                error = %err,
                "undecodable register content"
            );
            err.into()
        })
    }

    /// Encode and write one field.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Protocol`] if `value` does not encode,
    /// before any I/O, or the errors of [`write`](Self::write).
    pub async fn write_field<C: Codec>(
        &mut self,
        field: &Field<C>,
        value: &C::Value,
    ) -> Result<(), ThermoHubError> {
        let words = field.encode(value)?;
        self.write(field.address, &words).await
    }

    async fn prepare(&mut self) {
        if let Some(last) = self.link.last_request {
            tokio::time::sleep_until(last + self.hub.message_delay).await;
        }
    }

    async fn ensure_connected(&mut self) -> Result<(), ThermoHubError> {
        if self.link.transport.is_connected() {
            return Ok(());
        }
        tracing::info!(hub = %self.hub.name, "connecting to modbus gateway");
        self.link.transport.connect().await
    }

    /// Decide whether a failed attempt is retried. Returns `Ok` after the
    /// backoff when it is, or the error to surface when it is not.
    async fn recover(
        &mut self,
        err: ThermoHubError,
        attempt: &mut u32,
        address: u16,
    ) -> Result<(), ThermoHubError> {
        let cause = match err {
            ThermoHubError::Connection(cause) => cause,
            other => return Err(other),
        };
        if *attempt >= self.hub.policy.max_attempts {
            tracing::warn!(
                hub = %self.hub.name,
                address,
                attempts = *attempt,
                error = %cause,
                "modbus request failed, giving up"
            );
            return Err(ConnectionError::Exhausted {
                attempts: *attempt,
                last: Box::new(cause),
            }
            .into());
        }
        let delay = self.hub.policy.backoff(*attempt);
        tracing::warn!(
            hub = %self.hub.name,
            address,
            attempt = *attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %cause,
            "modbus request failed, reconnecting"
        );
        if let Err(close_err) = self.link.transport.close().await {
            tracing::debug!(error = %close_err, "closing broken connection failed");
        }
        tokio::time::sleep(delay).await;
        *attempt += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_hub, seeded_gateway};
    use thermohub_domain::error::ProtocolError;
    use thermohub_domain::register::ZONE_MODE;
    use thermohub_domain::zone::ZoneMode;

    #[test]
    fn should_double_backoff_up_to_the_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(1600));
        assert_eq!(policy.backoff(5), Duration::from_secs(2));
        assert_eq!(policy.backoff(40), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn should_connect_lazily_on_first_request() {
        let gateway = seeded_gateway();
        let hub = fast_hub(gateway.clone());
        assert_eq!(gateway.bank().connects, 0);

        assert_eq!(hub.health_check().await.unwrap(), 1);
        assert_eq!(gateway.bank().connects, 1);
    }

    #[tokio::test]
    async fn should_reconnect_and_retry_when_request_times_out() {
        let gateway = seeded_gateway();
        gateway.bank().failing_requests = 2;
        let hub = fast_hub(gateway.clone());

        let mode = hub.session().await.read_field(&ZONE_MODE).await.unwrap();
        assert_eq!(mode, ZoneMode::Scheduling);
        assert_eq!(gateway.bank().connects, 3);
    }

    #[tokio::test]
    async fn should_give_up_after_max_attempts() {
        let gateway = seeded_gateway();
        gateway.bank().failing_requests = 10;
        let hub = fast_hub(gateway.clone());

        let err = hub.read(640, 1).await.unwrap_err();
        assert!(matches!(
            err,
            ThermoHubError::Connection(ConnectionError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(gateway.bank().failing_requests, 7);
    }

    #[tokio::test]
    async fn should_not_retry_device_exception() {
        let gateway = seeded_gateway();
        gateway.bank().exception_at = Some(640);
        let hub = fast_hub(gateway.clone());

        let err = hub.read(640, 1).await.unwrap_err();
        assert!(matches!(
            err,
            ThermoHubError::Protocol(ProtocolError::DeviceException { address: 640, .. })
        ));
        assert_eq!(gateway.bank().connects, 1);
    }

    #[tokio::test]
    async fn should_reject_unencodable_value_before_io() {
        let gateway = seeded_gateway();
        let hub = fast_hub(gateway.clone());

        let err = hub
            .session()
            .await
            .write_field(&thermohub_domain::register::ROOM_MANUAL_SETPOINT, &Some(45.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ThermoHubError::Protocol(_)));
        assert!(gateway.bank().writes.is_empty());
        assert_eq!(gateway.bank().connects, 0);
    }

    #[tokio::test]
    async fn should_serialize_concurrent_sessions() {
        let gateway = seeded_gateway();
        let hub = std::sync::Arc::new(fast_hub(gateway.clone()));

        let first = hub.session().await;
        let contender = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.read(640, 1).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(gateway.bank().reads, 0);

        drop(first);
        contender.await.unwrap().unwrap();
        assert_eq!(gateway.bank().reads, 1);
    }

    #[tokio::test]
    async fn should_close_idempotently() {
        let gateway = seeded_gateway();
        let hub = fast_hub(gateway.clone());
        hub.health_check().await.unwrap();

        hub.close().await.unwrap();
        hub.close().await.unwrap();
        assert_eq!(gateway.bank().closes, 1);
    }

    #[tokio::test]
    async fn should_pace_consecutive_requests() {
        let gateway = seeded_gateway();
        let hub = Hub::new(
            "paced",
            gateway,
            RetryPolicy::default(),
            Duration::from_millis(20),
        );
        let mut session = hub.session().await;
        let started = Instant::now();
        session.read(640, 1).await.unwrap();
        session.read(641, 1).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
