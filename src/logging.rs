//! Logging facade for library code.
//!
//! The driver and record modules are compiled for two very different targets:
//! - Firmware (`firmware` feature): forwards to `defmt` over RTT
//! - Host unit tests: prints to stdout/stderr so failing tests show the
//!   driver's diagnostics
//! - Host non-test builds: no-op
//!
//! Format strings must stay within the subset understood by both `defmt` and
//! `core::fmt` (`{}`, `{:?}`, `{:02X}`).

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "firmware")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "firmware"), test))]
        std::println!("[INFO] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "firmware"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "firmware")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "firmware"), test))]
        std::println!("[WARN] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "firmware"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "firmware")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "firmware"), test))]
        std::eprintln!("[ERROR] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "firmware"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "firmware")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "firmware"), test))]
        std::println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "firmware"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}
