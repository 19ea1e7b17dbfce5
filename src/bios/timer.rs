use crate::bios::{clear_carry, run_service, Service, ServiceResult};
use crate::engine::Cpu;
use crate::machine::Vm;

/// INT 1Ah — Time of day services
pub fn int1ah(vm: &mut Vm) -> ServiceResult {
    run_service(vm, SERVICES)
}

const SERVICES: &[(u8, Service)] = &[
    (0x00, tick_count),
    (0x02, rtc_time),
    (0x04, rtc_date),
];

/// AH=00h ticks since midnight in CX:DX, derived from the host clock.
/// One tick is 54.9254 ms (the 18.2065 Hz PC timer).
fn tick_count(vm: &mut Vm) -> ServiceResult {
    let now = LocalTime::now();
    let ms_since_midnight =
        (now.hour as u64 * 3600 + now.minute as u64 * 60 + now.second as u64) * 1000;
    let ticks = (ms_since_midnight * 10_000 / 549_254) as u32;

    vm.set_cx((ticks >> 16) as u16)?;
    vm.set_dx(ticks as u16)?;
    vm.set_al(0)?; // midnight rollover not tracked
    clear_carry(vm)
}

/// AH=02h RTC time in BCD: CH=hours, CL=minutes, DH=seconds.
fn rtc_time(vm: &mut Vm) -> ServiceResult {
    let now = LocalTime::now();
    vm.set_ch(to_bcd(now.hour))?;
    vm.set_cl(to_bcd(now.minute))?;
    vm.set_dh(to_bcd(now.second))?;
    vm.set_dl(0)?; // no daylight saving flag
    clear_carry(vm)
}

/// AH=04h RTC date in BCD: CH=century, CL=year, DH=month, DL=day.
fn rtc_date(vm: &mut Vm) -> ServiceResult {
    let now = LocalTime::now();
    vm.set_ch(to_bcd((now.year / 100) as u8))?;
    vm.set_cl(to_bcd((now.year % 100) as u8))?;
    vm.set_dh(to_bcd(now.month))?;
    vm.set_dl(to_bcd(now.day))?;
    clear_carry(vm)
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Broken-down local wall-clock time.
struct LocalTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl LocalTime {
    #[cfg(windows)]
    fn now() -> Self {
        use std::mem::MaybeUninit;

        #[repr(C)]
        struct SystemTime {
            year: u16,
            month: u16,
            day_of_week: u16,
            day: u16,
            hour: u16,
            minute: u16,
            second: u16,
            milliseconds: u16,
        }
        extern "system" {
            fn GetLocalTime(st: *mut SystemTime);
        }

        let mut st = MaybeUninit::<SystemTime>::uninit();
        unsafe {
            GetLocalTime(st.as_mut_ptr());
            let st = st.assume_init();
            Self {
                year: st.year,
                month: st.month as u8,
                day: st.day as u8,
                hour: st.hour as u8,
                minute: st.minute as u8,
                second: st.second as u8,
            }
        }
    }

    #[cfg(not(windows))]
    fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        #[repr(C)]
        struct Tm {
            tm_sec: i32,
            tm_min: i32,
            tm_hour: i32,
            tm_mday: i32,
            tm_mon: i32,
            tm_year: i32,
            // remaining fields unused
        }
        extern "C" {
            fn localtime(time: *const i64) -> *const Tm;
        }

        let epoch = Self {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        };

        let secs = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => return epoch,
        };
        unsafe {
            let tm = localtime(&secs);
            if tm.is_null() {
                return epoch;
            }
            Self {
                year: ((*tm).tm_year + 1900) as u16,
                month: ((*tm).tm_mon + 1) as u8,
                day: (*tm).tm_mday as u8,
                hour: (*tm).tm_hour as u8,
                minute: (*tm).tm_min as u8,
                second: (*tm).tm_sec as u8,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_encoding() {
        assert_eq!(to_bcd(0), 0x00);
        assert_eq!(to_bcd(9), 0x09);
        assert_eq!(to_bcd(12), 0x12);
        assert_eq!(to_bcd(59), 0x59);
    }

    #[test]
    fn local_time_is_plausible() {
        let now = LocalTime::now();
        assert!(now.year >= 1970);
        assert!((1..=12).contains(&now.month));
        assert!((1..=31).contains(&now.day));
        assert!(now.hour < 24);
        assert!(now.minute < 60);
        assert!(now.second < 61);
    }
}
