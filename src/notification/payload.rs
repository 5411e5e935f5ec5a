use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

pub const NOTIFICATION_ICON: &str = "/favicon.ico";
pub const NOTIFICATION_BADGE: &str = "/favicon.ico";

/// Body of a push message, as produced by the shift poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub ok: bool,
    pub title: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shifts: Option<Shifts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftInfo {
    pub total_pay: f64,
    pub duration: f64,
    pub total_commute_time: f64,
    pub outbound_departure_time: String,
    pub starttime: String,
    pub endtime: String,
    pub return_arrival_time: String,
    pub date: String,
    pub role: String,
}

/// Shifts keyed by id, kept in the order a JavaScript object would iterate
/// them: integer-like ids ascending, then the other ids in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shifts(Vec<(String, ShiftInfo)>);

impl NotificationPayload {
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Notification body: one line per shift followed by a blank line and the
    /// poll time, or the error text followed by the poll time.
    pub fn body(&self) -> String {
        if self.ok {
            let mut body = String::new();
            if let Some(shifts) = &self.shifts {
                for (_, shift) in shifts.iter() {
                    body.push_str(&shift.summary_line());
                    body.push('\n');
                }
            }
            format!("{}\n{}", body, self.time)
        } else {
            format!("{}\n{}", self.error.as_deref().unwrap_or_default(), self.time)
        }
    }
}

impl ShiftInfo {
    pub fn summary_line(&self) -> String {
        format!(
            "£{} {}h ({}) {}>{}-{}>{} {} {}",
            to_fixed(self.total_pay, 0),
            self.duration,
            to_fixed(self.total_commute_time, 1),
            self.outbound_departure_time,
            self.starttime,
            self.endtime,
            self.return_arrival_time,
            self.date,
            self.role
        )
    }
}

impl Shifts {
    pub fn new(entries: Vec<(String, ShiftInfo)>) -> Self {
        let (mut indexed, named): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|(id, _)| array_index(id).is_some());
        indexed.sort_by_key(|(id, _)| array_index(id));
        indexed.extend(named);
        Shifts(indexed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShiftInfo)> {
        self.0.iter().map(|(id, shift)| (id.as_str(), shift))
    }
}

impl Serialize for Shifts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, shift) in &self.0 {
            map.serialize_entry(id, shift)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Shifts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ShiftsVisitor;

        impl<'de> Visitor<'de> for ShiftsVisitor {
            type Value = Shifts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of shift id to shift")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Shifts, A::Error> {
                let mut entries: Vec<(String, ShiftInfo)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, shift)) = access.next_entry::<String, ShiftInfo>()? {
                    // later duplicates replace earlier ones in place, like object literals
                    match entries.iter_mut().find(|(existing, _)| *existing == id) {
                        Some(entry) => entry.1 = shift,
                        None => entries.push((id, shift)),
                    }
                }
                Ok(Shifts::new(entries))
            }
        }

        deserializer.deserialize_map(ShiftsVisitor)
    }
}

/// Canonical array-index keys (`"0"`, `"17"`, not `"017"`) sort first in
/// JavaScript property order.
fn array_index(key: &str) -> Option<u32> {
    let n: u32 = key.parse().ok()?;
    (n != u32::MAX && n.to_string() == key).then_some(n)
}

/// `Number.prototype.toFixed`: rounds the exact stored value, with exact
/// ties going away from zero instead of to even.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if is_exact_tie(value, digits) {
        // (k + 0.5) * 10^-digits, so the scaled value is exactly representable
        let factor = 10f64.powi(digits as i32);
        format!("{:.*}", digits, (value * factor).round() / factor)
    } else {
        format!("{:.*}", digits, value)
    }
}

/// True when the exact binary value has a `5` right after the kept digits and
/// nothing but zeros behind it. 1100 places covers every finite f64.
fn is_exact_tie(value: f64, digits: usize) -> bool {
    if !value.is_finite() {
        return false;
    }
    let exact = format!("{:.1100}", value.abs());
    let Some((_, fraction)) = exact.split_once('.') else {
        return false;
    };
    match fraction.as_bytes().get(digits..) {
        Some([b'5', rest @ ..]) => rest.iter().all(|&b| b == b'0'),
        _ => false,
    }
}
