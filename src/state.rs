//! Scan states
//!
//! The flow occupies exactly one `ScanState` at a time. Presentation attributes
//! (icon, color class, copy, visibility flags) are derived from the variant on
//! demand so a renderer never reads a stale flag that disagrees with the state.
//!
//! Register and verify sessions share this state space, but each mode can only
//! reach a subset of it. `is_legal_for` encodes that subset and
//! `from_error` is the single error-to-state policy used by every consumer.

use crate::scan::errors::ScanError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const VERIFICATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Register,
    Verify,
}

impl ScanMode {
    pub fn service_title(&self) -> &'static str {
        "Palm service"
    }

    pub fn headline(&self) -> &'static str {
        "Place your palm"
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            ScanMode::Register => "Place your palm in the\ncircular area",
            ScanMode::Verify => "Please scan palm to pass",
        }
    }

    /// State a session rests in before a scan and after `stop()`.
    pub fn idle_state(&self) -> ScanState {
        match self {
            ScanMode::Register => ScanState::NotEnrolledWithEnrollmentOption,
            ScanMode::Verify => ScanState::Ready,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Register => "register",
            ScanMode::Verify => "verify",
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "register" | "enroll" => Ok(ScanMode::Register),
            "verify" => Ok(ScanMode::Verify),
            other => Err(format!("Unknown scan mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Success,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Palm,
    Checkmark,
    Info,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::Palm => "hand.raised.fill",
            Icon::Checkmark => "checkmark.circle.fill",
            Icon::Info => "info.circle.fill",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Ready,
    Scanning,
    RegistrationSuccess,
    VerificationSuccess {
        subject_name: String,
        timestamp: DateTime<Local>,
    },

    NotEnrolledWithEnrollmentOption,
    NotEnrolledNoOption,

    NetworkError,
    DeviceNotActivated,
    DeviceNotInitialized,
}

impl ScanState {
    /// Maps a failed attempt's cause onto the state shown to the user.
    ///
    /// Registration always offers the enrollment path, so `NotEnrolled` never
    /// lands on `NotEnrolledNoOption` in register mode.
    pub fn from_error(error: &ScanError, mode: ScanMode) -> Self {
        match error {
            ScanError::Network(_) => ScanState::NetworkError,
            ScanError::DeviceNotActivated(_) => ScanState::DeviceNotActivated,
            ScanError::DeviceNotInitialized(_) => ScanState::DeviceNotInitialized,
            ScanError::NotEnrolled(_) => match mode {
                ScanMode::Register => ScanState::NotEnrolledWithEnrollmentOption,
                ScanMode::Verify => ScanState::NotEnrolledNoOption,
            },
            ScanError::Unknown(_) => ScanState::NetworkError,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Ready => "ready",
            ScanState::Scanning => "scanning",
            ScanState::RegistrationSuccess => "registration_success",
            ScanState::VerificationSuccess { .. } => "verification_success",
            ScanState::NotEnrolledWithEnrollmentOption => "not_enrolled_with_option",
            ScanState::NotEnrolledNoOption => "not_enrolled_no_option",
            ScanState::NetworkError => "network_error",
            ScanState::DeviceNotActivated => "device_not_activated",
            ScanState::DeviceNotInitialized => "device_not_initialized",
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning)
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ScanState::RegistrationSuccess | ScanState::VerificationSuccess { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ScanState::NetworkError | ScanState::DeviceNotActivated | ScanState::DeviceNotInitialized
        )
    }

    pub fn is_guidance(&self) -> bool {
        matches!(
            self,
            ScanState::NotEnrolledWithEnrollmentOption | ScanState::NotEnrolledNoOption
        )
    }

    pub fn is_legal_for(&self, mode: ScanMode) -> bool {
        match self {
            ScanState::RegistrationSuccess => mode == ScanMode::Register,
            ScanState::VerificationSuccess { .. } | ScanState::NotEnrolledNoOption => {
                mode == ScanMode::Verify
            }
            _ => true,
        }
    }

    pub fn icon(&self) -> Icon {
        match self {
            ScanState::Ready | ScanState::Scanning => Icon::Palm,
            ScanState::RegistrationSuccess | ScanState::VerificationSuccess { .. } => {
                Icon::Checkmark
            }
            _ => Icon::Info,
        }
    }

    pub fn color_class(&self) -> ColorClass {
        match self {
            ScanState::Ready
            | ScanState::Scanning
            | ScanState::RegistrationSuccess
            | ScanState::VerificationSuccess { .. } => ColorClass::Success,
            _ => ColorClass::Warning,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ScanState::Ready | ScanState::Scanning => "Place your palm",
            ScanState::NotEnrolledWithEnrollmentOption | ScanState::NotEnrolledNoOption => {
                "No palm registered"
            }
            ScanState::RegistrationSuccess => "Registration Succeed",
            ScanState::VerificationSuccess { .. } => "Welcome",
            ScanState::NetworkError => "Network anomaly",
            ScanState::DeviceNotActivated => "Device not activated",
            ScanState::DeviceNotInitialized => "Device not initialized",
        }
    }

    pub fn subtitle(&self) -> Cow<'static, str> {
        match self {
            ScanState::Ready => Cow::Borrowed("Place your palm in the\ncircular area"),
            ScanState::Scanning => Cow::Borrowed("Please scan palm to pass"),
            ScanState::NotEnrolledNoOption => Cow::Borrowed("Please contact the administrator"),
            ScanState::NotEnrolledWithEnrollmentOption => {
                Cow::Borrowed("Please continue on your phone")
            }
            ScanState::RegistrationSuccess => Cow::Borrowed("Welcome to use Palm Service"),
            ScanState::VerificationSuccess {
                subject_name,
                timestamp,
            } => Cow::Owned(format!(
                "{}\nVerification time: {}",
                subject_name,
                timestamp.format(VERIFICATION_TIME_FORMAT)
            )),
            ScanState::NetworkError => Cow::Borrowed("Please check the network"),
            ScanState::DeviceNotActivated => Cow::Borrowed("Please activate before use"),
            ScanState::DeviceNotInitialized => Cow::Borrowed("Please contact the administrator"),
        }
    }

    pub fn shows_enrollment_code(&self) -> bool {
        matches!(
            self,
            ScanState::NotEnrolledWithEnrollmentOption | ScanState::NetworkError
        )
    }

    pub fn shows_retry_action(&self) -> bool {
        matches!(
            self,
            ScanState::DeviceNotActivated | ScanState::DeviceNotInitialized | ScanState::NetworkError
        )
    }

    pub fn shows_live_scan_guide(&self) -> bool {
        matches!(self, ScanState::Ready | ScanState::Scanning)
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, hour, minute, second)
            .single()
            .unwrap()
    }

    fn all_states() -> Vec<ScanState> {
        vec![
            ScanState::Ready,
            ScanState::Scanning,
            ScanState::RegistrationSuccess,
            ScanState::VerificationSuccess {
                subject_name: "Jane Doe".to_string(),
                timestamp: at(9, 30, 0),
            },
            ScanState::NotEnrolledWithEnrollmentOption,
            ScanState::NotEnrolledNoOption,
            ScanState::NetworkError,
            ScanState::DeviceNotActivated,
            ScanState::DeviceNotInitialized,
        ]
    }

    #[test]
    fn test_error_to_state_mapping_verify() {
        let mode = ScanMode::Verify;
        assert_eq!(
            ScanState::from_error(&ScanError::network(), mode),
            ScanState::NetworkError
        );
        assert_eq!(
            ScanState::from_error(&ScanError::device_not_activated(), mode),
            ScanState::DeviceNotActivated
        );
        assert_eq!(
            ScanState::from_error(&ScanError::device_not_initialized(), mode),
            ScanState::DeviceNotInitialized
        );
        assert_eq!(
            ScanState::from_error(&ScanError::not_enrolled(), mode),
            ScanState::NotEnrolledNoOption
        );
        assert_eq!(
            ScanState::from_error(&ScanError::unknown(), mode),
            ScanState::NetworkError
        );
    }

    #[test]
    fn test_error_to_state_mapping_register() {
        let mode = ScanMode::Register;
        assert_eq!(
            ScanState::from_error(&ScanError::network(), mode),
            ScanState::NetworkError
        );
        assert_eq!(
            ScanState::from_error(&ScanError::device_not_activated(), mode),
            ScanState::DeviceNotActivated
        );
        assert_eq!(
            ScanState::from_error(&ScanError::device_not_initialized(), mode),
            ScanState::DeviceNotInitialized
        );
        assert_eq!(
            ScanState::from_error(&ScanError::not_enrolled(), mode),
            ScanState::NotEnrolledWithEnrollmentOption
        );
        assert_eq!(
            ScanState::from_error(&ScanError::unknown(), mode),
            ScanState::NetworkError
        );
    }

    #[test]
    fn test_mapped_states_are_legal_for_mode() {
        let errors = [
            ScanError::network(),
            ScanError::device_not_activated(),
            ScanError::device_not_initialized(),
            ScanError::not_enrolled(),
            ScanError::unknown(),
        ];

        for mode in [ScanMode::Register, ScanMode::Verify] {
            for error in &errors {
                let state = ScanState::from_error(error, mode);
                assert!(state.is_legal_for(mode), "{} illegal in {:?}", state, mode);
            }
        }
    }

    #[test]
    fn test_mode_gated_variants() {
        let verified = ScanState::VerificationSuccess {
            subject_name: "Jane Doe".to_string(),
            timestamp: at(9, 30, 0),
        };

        assert!(ScanState::RegistrationSuccess.is_legal_for(ScanMode::Register));
        assert!(!ScanState::RegistrationSuccess.is_legal_for(ScanMode::Verify));
        assert!(verified.is_legal_for(ScanMode::Verify));
        assert!(!verified.is_legal_for(ScanMode::Register));
        assert!(!ScanState::NotEnrolledNoOption.is_legal_for(ScanMode::Register));
        assert!(ScanState::NotEnrolledWithEnrollmentOption.is_legal_for(ScanMode::Register));
        assert!(ScanState::NotEnrolledWithEnrollmentOption.is_legal_for(ScanMode::Verify));
    }

    #[test]
    fn test_idle_states() {
        assert_eq!(
            ScanMode::Register.idle_state(),
            ScanState::NotEnrolledWithEnrollmentOption
        );
        assert_eq!(ScanMode::Verify.idle_state(), ScanState::Ready);
    }

    #[test]
    fn test_verification_success_equality() {
        let t = at(9, 30, 0);
        let a = ScanState::VerificationSuccess {
            subject_name: "Jane Doe".to_string(),
            timestamp: t,
        };
        let same = ScanState::VerificationSuccess {
            subject_name: "Jane Doe".to_string(),
            timestamp: t,
        };
        let other_name = ScanState::VerificationSuccess {
            subject_name: "John Roe".to_string(),
            timestamp: t,
        };
        let other_time = ScanState::VerificationSuccess {
            subject_name: "Jane Doe".to_string(),
            timestamp: at(9, 30, 1),
        };

        assert_eq!(a, same);
        assert_ne!(a, other_name);
        assert_ne!(a, other_time);
        assert_ne!(a, ScanState::RegistrationSuccess);
    }

    #[test]
    fn test_unit_variants_compare_by_tag() {
        let states = all_states();
        for (i, left) in states.iter().enumerate() {
            for (j, right) in states.iter().enumerate() {
                assert_eq!(left == right, i == j, "{} vs {}", left, right);
            }
        }
    }

    #[test]
    fn test_verification_subtitle_formats_name_and_time() {
        let state = ScanState::VerificationSuccess {
            subject_name: "Jane Doe".to_string(),
            timestamp: at(14, 5, 9),
        };

        assert_eq!(
            state.subtitle(),
            "Jane Doe\nVerification time: 2024-03-09 14:05:09"
        );
        assert_eq!(state.title(), "Welcome");
    }

    #[test]
    fn test_presentation_flags() {
        for state in all_states() {
            let expected_code = matches!(
                state,
                ScanState::NotEnrolledWithEnrollmentOption | ScanState::NetworkError
            );
            let expected_retry = state.is_error();
            let expected_guide = matches!(state, ScanState::Ready | ScanState::Scanning);

            assert_eq!(state.shows_enrollment_code(), expected_code, "{}", state);
            assert_eq!(state.shows_retry_action(), expected_retry, "{}", state);
            assert_eq!(state.shows_live_scan_guide(), expected_guide, "{}", state);
        }

        assert!(!ScanState::NotEnrolledNoOption.shows_retry_action());
        assert_eq!(
            ScanState::NotEnrolledNoOption.subtitle(),
            "Please contact the administrator"
        );
    }

    #[test]
    fn test_icons_and_colors() {
        assert_eq!(ScanState::Scanning.icon(), Icon::Palm);
        assert_eq!(ScanState::RegistrationSuccess.icon(), Icon::Checkmark);
        assert_eq!(ScanState::NetworkError.icon(), Icon::Info);
        assert_eq!(Icon::Palm.as_str(), "hand.raised.fill");

        for state in all_states() {
            let expected = if state.shows_live_scan_guide() || state.is_success() {
                ColorClass::Success
            } else {
                ColorClass::Warning
            };
            assert_eq!(state.color_class(), expected, "{}", state);
        }
    }

    #[test]
    fn test_scan_mode_parsing() {
        assert_eq!("register".parse::<ScanMode>(), Ok(ScanMode::Register));
        assert_eq!("Verify".parse::<ScanMode>(), Ok(ScanMode::Verify));
        assert!("unlock".parse::<ScanMode>().is_err());
        assert_eq!(ScanMode::Verify.instructions(), "Please scan palm to pass");
    }

    #[test]
    fn test_scan_mode_serialization() {
        for mode in [ScanMode::Register, ScanMode::Verify] {
            let json = serde_json::to_string(&mode).unwrap();
            let deserialized: ScanMode = serde_json::from_str(&json).unwrap();
            assert_eq!(mode, deserialized);
        }
        assert_eq!(
            serde_json::to_string(&ScanMode::Register).unwrap(),
            "\"register\""
        );
    }
}
