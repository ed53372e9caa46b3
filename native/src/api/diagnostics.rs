use crate::announcer::{ConnectionState, DeliveryStats};

/// Delivery counters of the installed announcer, if any.
pub fn delivery_stats() -> Option<DeliveryStats> {
    crate::with_installed(|announcer| announcer.stats())
}

/// Connection state of the installed announcer, if any.
pub fn connection_state() -> Option<ConnectionState> {
    crate::with_installed(|announcer| announcer.state())
}

/// Retrieve the crash log path if the logger has been initialized.
pub fn get_crash_log_path() -> Option<String> {
    crate::logging::get_crash_log_path()
}

/// Forward critical errors from higher layers into the crash logger.
pub fn log_critical_error(context: &str, error: &str) {
    crate::logging::log_critical_error(context, error);
}
