//! Status-check injection.
//!
//! Every engine call without explicit status handling is followed by an
//! [`StatusCheck::Engine`]; every `$status = ACTION` line by a
//! [`StatusCheck::LastStatus`]. Running the pass twice changes nothing.

use super::step::{StatusCheck, Step};

pub fn inject_status_checks(steps: Vec<Step>) -> Vec<Step> {
    let mut out = Vec::with_capacity(steps.len() * 2);
    let mut iter = steps.into_iter().peekable();
    while let Some(step) = iter.next() {
        let check = match &step {
            Step::EngineCall {
                engine,
                operation,
                args,
                record: false,
                ..
            } => Some(StatusCheck::Engine {
                engine: engine.clone(),
                operation: operation.clone(),
                args: args.clone(),
            }),
            Step::Raw {
                action,
                record: true,
                ..
            } => Some(StatusCheck::LastStatus {
                action: action.clone(),
            }),
            _ => None,
        };
        out.push(step);
        if let Some(check) = check {
            if !matches!(iter.peek(), Some(Step::Check(_))) {
                out.push(Step::Check(check));
            }
        }
    }
    out
}
