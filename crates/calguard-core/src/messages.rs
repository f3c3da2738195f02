//! User-facing rendering of provider failures.
//!
//! Kept apart from [`crate::error`] so retry and dispatch logic never depend
//! on presentation.

use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, FailureKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

/// Human-readable message for `err` in `locale`.
pub fn user_message(err: &CalendarError, locale: Locale) -> String {
    let wait = err.retry_after.map(|d| d.as_secs());
    match locale {
        Locale::En => english(err.kind, wait),
        Locale::Ko => korean(err.kind, wait),
    }
}

fn english(kind: FailureKind, wait: Option<u64>) -> String {
    match (kind, wait) {
        (FailureKind::TransientNetwork, _) => {
            "There is a problem with the network connection. Check your connection and try again."
                .to_string()
        }
        (FailureKind::QuotaExceeded, Some(secs)) => {
            format!("The calendar API usage limit was exceeded. Try again in {secs} seconds.")
        }
        (FailureKind::QuotaExceeded, None) => {
            "The calendar API usage limit was exceeded. Try again shortly.".to_string()
        }
        (FailureKind::RateLimited, Some(secs)) => {
            format!("Too many requests were made. Try again in {secs} seconds.")
        }
        (FailureKind::RateLimited, None) => {
            "Too many requests were made. Try again shortly.".to_string()
        }
        (FailureKind::AuthExpired, _) => {
            "Your sign-in session has expired. Please sign in again.".to_string()
        }
        (FailureKind::PermissionDenied, _) => {
            "You do not have permission to access this calendar. Check its sharing settings."
                .to_string()
        }
        (FailureKind::ServerError, _) => {
            "The calendar server is having temporary problems. Try again shortly.".to_string()
        }
        (FailureKind::NotFound, _) => "The requested event could not be found.".to_string(),
        (FailureKind::InvalidData, _) => {
            "The event details are invalid. Make sure the title, start and end are filled in."
                .to_string()
        }
        (FailureKind::GenericService, _) => {
            "The calendar request could not be completed.".to_string()
        }
    }
}

fn korean(kind: FailureKind, wait: Option<u64>) -> String {
    match (kind, wait) {
        (FailureKind::TransientNetwork, _) => {
            "인터넷 연결에 문제가 있습니다. 네트워크 상태를 확인하고 다시 시도해주세요.".to_string()
        }
        (FailureKind::QuotaExceeded, Some(secs)) => {
            format!("캘린더 API 사용량이 한도를 초과했습니다. {secs}초 후에 다시 시도해주세요.")
        }
        (FailureKind::QuotaExceeded, None) => {
            "캘린더 API 사용량이 한도를 초과했습니다. 잠시 후 다시 시도해주세요.".to_string()
        }
        (FailureKind::RateLimited, Some(secs)) => {
            format!("너무 많은 요청이 발생했습니다. {secs}초 후에 다시 시도해주세요.")
        }
        (FailureKind::RateLimited, None) => {
            "너무 많은 요청이 발생했습니다. 잠시 후 다시 시도해주세요.".to_string()
        }
        (FailureKind::AuthExpired, _) => {
            "인증 세션이 만료되었습니다. 다시 로그인해주세요.".to_string()
        }
        (FailureKind::PermissionDenied, _) => {
            "캘린더에 접근할 권한이 없습니다. 권한 설정을 확인해주세요.".to_string()
        }
        (FailureKind::ServerError, _) => {
            "캘린더 서버에 일시적인 문제가 발생했습니다. 잠시 후 다시 시도해주세요.".to_string()
        }
        (FailureKind::NotFound, _) => "요청하신 일정을 찾을 수 없습니다.".to_string(),
        (FailureKind::InvalidData, _) => {
            "일정 정보가 올바르지 않습니다. 필수 정보를 모두 입력했는지 확인해주세요.".to_string()
        }
        (FailureKind::GenericService, _) => "캘린더 요청을 처리하지 못했습니다.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn every_kind_has_a_message() {
        for kind in FailureKind::ALL {
            let err = CalendarError::new(kind, "detail");
            assert!(!user_message(&err, Locale::En).is_empty());
            assert!(!user_message(&err, Locale::Ko).is_empty());
        }
    }

    #[test]
    fn retry_after_hint_is_rendered() {
        let err = CalendarError::new(FailureKind::RateLimited, "429")
            .with_retry_after(Duration::from_secs(30));
        assert!(user_message(&err, Locale::En).contains("30 seconds"));
        assert!(user_message(&err, Locale::Ko).contains("30초"));
    }

    #[test]
    fn technical_detail_is_not_leaked() {
        let err = CalendarError::new(FailureKind::ServerError, "HTTP 502: upstream exploded");
        assert!(!user_message(&err, Locale::En).contains("upstream"));
    }
}
