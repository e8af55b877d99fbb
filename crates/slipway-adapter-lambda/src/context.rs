use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use slipway_core::http::Request;

use crate::event::EventKind;

/// Execution metadata the platform supplies alongside each event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    /// Invocation deadline in milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    pub trace_id: Option<String>,
}

impl InvocationContext {
    pub fn new<S>(request_id: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = deadline_ms;
        self
    }

    /// Time left before the platform stops the invocation, measured from `now`.
    pub fn remaining_at(&self, now: SystemTime) -> Duration {
        let deadline = UNIX_EPOCH + Duration::from_millis(self.deadline_ms);
        deadline.duration_since(now).unwrap_or(Duration::ZERO)
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(SystemTime::now())
    }
}

#[cfg(feature = "lambda")]
impl From<lambda_runtime::Context> for InvocationContext {
    fn from(context: lambda_runtime::Context) -> Self {
        Self {
            request_id: context.request_id,
            invoked_function_arn: context.invoked_function_arn,
            deadline_ms: context.deadline,
            trace_id: context.xray_trace_id,
        }
    }
}

/// Lambda-specific context data attached to each core request.
#[derive(Clone, Debug)]
pub struct LambdaRequestContext {
    pub kind: EventKind,
    pub source_ip: Option<IpAddr>,
    pub stage: Option<String>,
    pub invocation: InvocationContext,
}

impl LambdaRequestContext {
    pub fn insert(request: &mut Request, context: LambdaRequestContext) {
        request.extensions_mut().insert(context);
    }

    pub fn get(request: &Request) -> Option<&LambdaRequestContext> {
        request.extensions().get::<LambdaRequestContext>()
    }
}
