//! The closed intent vocabulary (spec §6).

use serde::{Deserialize, Serialize};

/// Every intent the classifier is permitted to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Greeting,
    Goodbye,
    Help,
    Unclear,

    RegisterPatient,
    FindPatient,
    UpdatePatient,

    BookAppointment,
    RescheduleAppointment,
    CancelAppointment,
    CheckAppointmentStatus,

    OpdCheckin,
    OpdQueueStatus,

    RequestAdmission,
    CheckBedAvailability,
    RequestBedAllocation,

    BookLabTest,
    CheckLabStatus,

    CheckBillStatus,
    GeneralStatusInquiry,

    ReportEmergency,
    EscalateToHuman,

    ConfirmYes,
    ConfirmNo,
    ProvideInformation,
}

impl Intent {
    /// The wire name used in JSON payloads and classifier prompts, matching
    /// the closed vocabulary in spec §6 verbatim (SCREAMING_SNAKE_CASE).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "GREETING",
            Self::Goodbye => "GOODBYE",
            Self::Help => "HELP",
            Self::Unclear => "UNCLEAR",
            Self::RegisterPatient => "REGISTER_PATIENT",
            Self::FindPatient => "FIND_PATIENT",
            Self::UpdatePatient => "UPDATE_PATIENT",
            Self::BookAppointment => "BOOK_APPOINTMENT",
            Self::RescheduleAppointment => "RESCHEDULE_APPOINTMENT",
            Self::CancelAppointment => "CANCEL_APPOINTMENT",
            Self::CheckAppointmentStatus => "CHECK_APPOINTMENT_STATUS",
            Self::OpdCheckin => "OPD_CHECKIN",
            Self::OpdQueueStatus => "OPD_QUEUE_STATUS",
            Self::RequestAdmission => "REQUEST_ADMISSION",
            Self::CheckBedAvailability => "CHECK_BED_AVAILABILITY",
            Self::RequestBedAllocation => "REQUEST_BED_ALLOCATION",
            Self::BookLabTest => "BOOK_LAB_TEST",
            Self::CheckLabStatus => "CHECK_LAB_STATUS",
            Self::CheckBillStatus => "CHECK_BILL_STATUS",
            Self::GeneralStatusInquiry => "GENERAL_STATUS_INQUIRY",
            Self::ReportEmergency => "REPORT_EMERGENCY",
            Self::EscalateToHuman => "ESCALATE_TO_HUMAN",
            Self::ConfirmYes => "CONFIRM_YES",
            Self::ConfirmNo => "CONFIRM_NO",
            Self::ProvideInformation => "PROVIDE_INFORMATION",
        }
    }

    /// Parse the wire name back into an `Intent`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "GREETING" => Self::Greeting,
            "GOODBYE" => Self::Goodbye,
            "HELP" => Self::Help,
            "UNCLEAR" => Self::Unclear,
            "REGISTER_PATIENT" => Self::RegisterPatient,
            "FIND_PATIENT" => Self::FindPatient,
            "UPDATE_PATIENT" => Self::UpdatePatient,
            "BOOK_APPOINTMENT" => Self::BookAppointment,
            "RESCHEDULE_APPOINTMENT" => Self::RescheduleAppointment,
            "CANCEL_APPOINTMENT" => Self::CancelAppointment,
            "CHECK_APPOINTMENT_STATUS" => Self::CheckAppointmentStatus,
            "OPD_CHECKIN" => Self::OpdCheckin,
            "OPD_QUEUE_STATUS" => Self::OpdQueueStatus,
            "REQUEST_ADMISSION" => Self::RequestAdmission,
            "CHECK_BED_AVAILABILITY" => Self::CheckBedAvailability,
            "REQUEST_BED_ALLOCATION" => Self::RequestBedAllocation,
            "BOOK_LAB_TEST" => Self::BookLabTest,
            "CHECK_LAB_STATUS" => Self::CheckLabStatus,
            "CHECK_BILL_STATUS" => Self::CheckBillStatus,
            "GENERAL_STATUS_INQUIRY" => Self::GeneralStatusInquiry,
            "REPORT_EMERGENCY" => Self::ReportEmergency,
            "ESCALATE_TO_HUMAN" => Self::EscalateToHuman,
            "CONFIRM_YES" => Self::ConfirmYes,
            "CONFIRM_NO" => Self::ConfirmNo,
            "PROVIDE_INFORMATION" => Self::ProvideInformation,
            _ => return None,
        })
    }

    /// Whether this intent is part of the "confirmation family" that always
    /// enters the active workflow as a continuation (spec §4.7).
    #[must_use]
    pub fn is_confirmation_family(self) -> bool {
        matches!(self, Self::ConfirmYes | Self::ConfirmNo | Self::ProvideInformation)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant_through_wire_name() {
        let all = [
            Intent::Greeting,
            Intent::Goodbye,
            Intent::Help,
            Intent::Unclear,
            Intent::RegisterPatient,
            Intent::FindPatient,
            Intent::UpdatePatient,
            Intent::BookAppointment,
            Intent::RescheduleAppointment,
            Intent::CancelAppointment,
            Intent::CheckAppointmentStatus,
            Intent::OpdCheckin,
            Intent::OpdQueueStatus,
            Intent::RequestAdmission,
            Intent::CheckBedAvailability,
            Intent::RequestBedAllocation,
            Intent::BookLabTest,
            Intent::CheckLabStatus,
            Intent::CheckBillStatus,
            Intent::GeneralStatusInquiry,
            Intent::ReportEmergency,
            Intent::EscalateToHuman,
            Intent::ConfirmYes,
            Intent::ConfirmNo,
            Intent::ProvideInformation,
        ];
        for intent in all {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn unknown_name_does_not_parse() {
        assert_eq!(Intent::parse("NOT_A_REAL_INTENT"), None);
    }

    #[test]
    fn confirmation_family_is_exactly_three_intents() {
        assert!(Intent::ConfirmYes.is_confirmation_family());
        assert!(Intent::ConfirmNo.is_confirmation_family());
        assert!(Intent::ProvideInformation.is_confirmation_family());
        assert!(!Intent::BookAppointment.is_confirmation_family());
    }
}
