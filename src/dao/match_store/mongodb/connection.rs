use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

/// Backoff applied while waiting for the first successful ping.
#[derive(Debug, Clone, Copy)]
struct PingBackoff {
    max_attempts: u32,
    delay: Duration,
    max_delay: Duration,
}

impl Default for PingBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl PingBackoff {
    /// Delay to wait after `attempt` failed pings, or `None` once attempts are exhausted.
    fn after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        Some(self.delay.saturating_mul(factor).min(self.max_delay))
    }
}

/// Build a client for the `matches` database and wait until the server answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);
    let backoff = PingBackoff::default();

    let mut attempts = 0;
    loop {
        let Err(err) = database.run_command(doc! { "ping": 1 }).await else {
            break;
        };
        attempts += 1;
        let Some(delay) = backoff.after(attempts) else {
            return Err(MongoDaoError::InitialPing {
                attempts,
                source: err,
            });
        };
        debug!(attempts, ?delay, error = %err, "MongoDB ping failed; retrying");
        sleep(delay).await;
    }

    Ok((client, database))
}
