use crate::Result;

/// A computation split into resumable steps.
///
/// One step is at most one primality probe, one modular exponentiation or
/// one modular inverse, so a cooperative driver can yield between them.
pub(crate) trait Steps {
    type Output;

    /// Advance by one step, returning the output once the computation is done
    fn step(&mut self) -> Result<Option<Self::Output>>;
}

/// Drive `steps` to completion on the current thread
pub(crate) fn run<S: Steps>(mut steps: S) -> Result<S::Output> {
    loop {
        if let Some(output) = steps.step()? {
            return Ok(output);
        }
    }
}

/// Drive `steps` to completion, yielding to the executor after every step
pub(crate) async fn run_async<S: Steps>(mut steps: S) -> Result<S::Output> {
    loop {
        if let Some(output) = steps.step()? {
            return Ok(output);
        }
        tokio::task::yield_now().await;
    }
}
