#![forbid(unsafe_code)]

use fieldops_contracts::actor::ActorId;
use fieldops_contracts::audit::{
    AuditEventInput, AuditEventType, AuditSeverity, PayloadKey, PayloadValue,
};
use fieldops_contracts::file::FileId;
use fieldops_contracts::hub::HubMessageId;
use fieldops_contracts::workorder::{WorkOrderId, WorkOrderStatus};
use fieldops_contracts::{CorrelationId, MonotonicTimeNs};
use fieldops_storage::FieldStore;

/// Change event fanned out to Hub subscribers after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    StatusChanged {
        work_order_id: WorkOrderId,
        to_status: WorkOrderStatus,
    },
    FileVisibilityChanged {
        file_id: FileId,
        visible_to_client: bool,
    },
    HubMessagePosted {
        message_id: HubMessageId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub detail: String,
}

/// The realtime fan-out collaborator. Delivery is at-most-once-per-change
/// and fire-and-forget: a failed delivery is not retried and never rolls
/// back the mutation it follows.
pub trait HubNotifier {
    fn notify(&self, work_order_id: &WorkOrderId, event: &HubEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

impl HubNotifier for NullNotifier {
    fn notify(&self, _work_order_id: &WorkOrderId, _event: &HubEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Deliver after commit. A failure leaves a WARN audit row behind and is
/// otherwise swallowed; the surrounding operation already succeeded.
pub(crate) fn fire_and_forget(
    store: &mut FieldStore,
    notifier: &dyn HubNotifier,
    now: MonotonicTimeNs,
    correlation_id: CorrelationId,
    actor_id: &ActorId,
    work_order_id: &WorkOrderId,
    event: &HubEvent,
) {
    if let Err(err) = notifier.notify(work_order_id, event) {
        let payload = match payload_value(&err.detail) {
            Some(value) => vec![(
                PayloadKey::new("detail").expect("static payload key"),
                value,
            )],
            None => vec![],
        };
        if let Ok(input) = AuditEventInput::v1(
            now,
            correlation_id,
            actor_id.clone(),
            Some(work_order_id.clone()),
            AuditEventType::NotifyDeliveryFailed,
            AuditSeverity::Warn,
            payload,
        ) {
            let _ = store.append_audit_event(input);
        }
    }
}

fn payload_value(detail: &str) -> Option<PayloadValue> {
    let sanitized: String = detail.chars().filter(|c| c.is_ascii()).take(160).collect();
    PayloadValue::new(sanitized).ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;

    use super::*;

    /// Records deliveries; optionally fails every delivery to exercise the
    /// swallow-and-audit path.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub delivered: RefCell<Vec<(WorkOrderId, HubEvent)>>,
        pub fail_all: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                delivered: RefCell::new(Vec::new()),
                fail_all: true,
            }
        }

        pub fn delivered_count(&self) -> usize {
            self.delivered.borrow().len()
        }
    }

    impl HubNotifier for RecordingNotifier {
        fn notify(
            &self,
            work_order_id: &WorkOrderId,
            event: &HubEvent,
        ) -> Result<(), NotifyError> {
            if self.fail_all {
                return Err(NotifyError {
                    detail: "subscriber endpoint unreachable".to_string(),
                });
            }
            self.delivered
                .borrow_mut()
                .push((work_order_id.clone(), event.clone()));
            Ok(())
        }
    }
}
