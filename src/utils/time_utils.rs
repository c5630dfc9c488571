//! 时间工具模块
//! 提供时间处理相关的工具函数

use chrono::{DateTime, Local, TimeZone};

/// 仪表盘日期格式：dd/mm/yyyy HH:MM
const DASHBOARD_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// 将 ISO 8601 时间串格式化为本地时区的 `dd/mm/yyyy HH:MM`
///
/// 例如 `2023-02-25T12:53:05.053Z` 在 UTC 时区下得到 `25/02/2023 12:53`
pub fn format_date(iso_string: &str) -> Result<String, chrono::ParseError> {
    format_date_in(iso_string, &Local)
}

/// 同 [`format_date`]，但使用指定时区
pub fn format_date_in<Tz>(iso_string: &str, tz: &Tz) -> Result<String, chrono::ParseError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let parsed = DateTime::parse_from_rfc3339(iso_string)?;
    Ok(parsed
        .with_timezone(tz)
        .format(DASHBOARD_DATE_FORMAT)
        .to_string())
}
