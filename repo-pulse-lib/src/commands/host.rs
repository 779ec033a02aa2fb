use std::io::Write;

/// Where commands write their results and diagnostics, and how they end the process
pub trait Host: Send + Sync {
    /// Stream for command results (JSON, text summaries)
    fn output(&mut self) -> impl Write;

    /// Stream for diagnostics that must not mix with results
    fn error(&mut self) -> impl Write;

    /// End the process with `code`. Test hosts record the request and return.
    fn exit(&mut self, code: i32);
}

/// Host that keeps everything written to it in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct TestHost {
    pub output_buf: Vec<u8>,
    pub error_buf: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[cfg(test)]
impl TestHost {
    pub const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
            exit_code: None,
        }
    }
}

#[cfg(test)]
impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}
