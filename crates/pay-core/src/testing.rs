//! Test doubles shared by the core's unit tests.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{AccessToken, PaymentGateway, RemoteCapture, RemoteOrder};
use crate::money::Amount;
use crate::notify::NotificationSink;
use crate::order::{ApplicationContext, Intent, PurchaseUnit};
use crate::transaction::{
    CaptureRecord, CapturedUnit, GatewayStatus, Payer, Transaction, TransactionId,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Gateway that hands out `PAY-{n}` ids and can be told to fail
pub(crate) struct ScriptedGateway {
    pub fail_auth: AtomicBool,
    reject_with: Mutex<Option<u16>>,
    capture_status: Mutex<GatewayStatus>,
    pub auth_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub capture_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_auth: AtomicBool::new(false),
            reject_with: Mutex::new(None),
            capture_status: Mutex::new(GatewayStatus::Completed),
            auth_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            capture_calls: AtomicUsize::new(0),
        })
    }

    /// Make create and capture fail with this HTTP status
    pub fn reject(&self, status: u16) {
        *self.reject_with.lock().unwrap() = Some(status);
    }

    pub fn accept(&self) {
        *self.reject_with.lock().unwrap() = None;
    }

    pub fn capture_with_status(&self, status: GatewayStatus) {
        *self.capture_status.lock().unwrap() = status;
    }

    fn rejection(&self) -> PaymentResult<()> {
        match *self.reject_with.lock().unwrap() {
            Some(status) => Err(PaymentError::gateway_request(status, None)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn authenticate(&self) -> PaymentResult<AccessToken> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(PaymentError::GatewayAuth("invalid_client".into()));
        }
        Ok(AccessToken::new("A21AA-test", Utc::now() + Duration::hours(9)))
    }

    async fn create_remote_order(
        &self,
        _token: &AccessToken,
        _intent: Intent,
        _purchase_units: &[PurchaseUnit],
        _application_context: &ApplicationContext,
    ) -> PaymentResult<RemoteOrder> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.rejection()?;
        Ok(RemoteOrder {
            gateway_order_id: format!("PAY-{n}"),
            status: GatewayStatus::Created,
            approval_link: Some(format!("https://pay/approve/{n}")),
        })
    }

    async fn capture_remote_order(&self, gateway_order_id: &str) -> PaymentResult<RemoteCapture> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        self.rejection()?;
        let status = *self.capture_status.lock().unwrap();
        Ok(RemoteCapture {
            gateway_order_id: gateway_order_id.to_string(),
            status,
            payer: Payer {
                email: "a@b.com".into(),
                given_name: "Ada".into(),
                surname: "Lovelace".into(),
            },
            purchase_units: vec![CapturedUnit {
                reference_id: "default".into(),
                captures: vec![CaptureRecord {
                    id: "CAP-1".into(),
                    status,
                    amount: Amount::new("USD", "20.00").unwrap(),
                }],
            }],
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Sink that reports every confirmation on a channel
pub(crate) struct RecordingNotifier {
    sent: mpsc::UnboundedSender<TransactionId>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<TransactionId>) {
        let (sent, received) = mpsc::unbounded_channel();
        (Arc::new(Self { sent, fail }), received)
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send_confirmation(&self, transaction: &Transaction) -> PaymentResult<()> {
        let _ = self.sent.send(transaction.id);
        if self.fail {
            return Err(PaymentError::Internal("mail server down".into()));
        }
        Ok(())
    }
}
