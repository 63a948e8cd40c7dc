//! Policy timing parameters.
//!
//! Reference: USB PD r3.0, 6.6 Timers; values follow the sink policy in
//! chapter 8.3.

#![allow(non_upper_case_globals)]

use crate::Duration;

/// Fallback poll cadence when no interrupt is pending
pub const tPDPolling: Duration = Duration::millis(100);

/// Wait for Source_Capabilities after attach before retrying
pub const tTypeCSinkWaitCap: Duration = Duration::millis(350);

/// Combined tSenderResponse and tPSTransition: Request to PS_RDY
pub const tRequestToPSReady: Duration = Duration::millis(580);

/// PPS keep-alive re-request period, must stay below the 10 s ceiling
pub const tPPSRequest: Duration = Duration::secs(5);
