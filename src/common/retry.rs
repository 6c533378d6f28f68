// src/common/retry.rs

use std::future::Future;
use std::time::Duration;

use crate::common::error::AppError;

// Política de timeout + retentativa aplicada a cada chamada ao banco ou ao
// armazenamento externo. Só erros passageiros (AppError::is_transient) são
// repetidos; o resto sobe na hora.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// delay = initial_delay * multiplier^attempt, limitado a max_delay.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Leituras e escritas idempotentes: repete qualquer falha passageira.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.run_with(operation, AppError::is_transient, call).await
    }

    /// Transações não idempotentes: só repete quando o banco garante que nada
    /// foi gravado. Timeout e erro de I/O podem chegar depois do COMMIT.
    pub async fn run_write<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.run_with(operation, AppError::is_replay_safe, call).await
    }

    async fn run_with<T, F, Fut>(
        &self,
        operation: &'static str,
        retryable: fn(&AppError) -> bool,
        mut call: F,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(operation)),
            };

            match result {
                Err(err) if retryable(&err) && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Falha passageira, tentando novamente: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
