use std::fmt;

/// COM status code as seen by guest code in `EAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HResult(pub u32);

const fn make_ddhresult(code: u32) -> HResult {
    HResult(0x8876_0000 | code)
}

impl HResult {
    pub const S_OK: HResult = HResult(0);
    pub const E_NOTIMPL: HResult = HResult(0x8000_4001);
    pub const E_POINTER: HResult = HResult(0x8000_4003);
    pub const E_FAIL: HResult = HResult(0x8000_4005);
    pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000E);
    pub const E_INVALIDARG: HResult = HResult(0x8007_0057);

    pub const DD_OK: HResult = Self::S_OK;
    pub const DDERR_GENERIC: HResult = Self::E_FAIL;
    pub const DDERR_UNSUPPORTED: HResult = Self::E_NOTIMPL;
    pub const DDERR_OUTOFMEMORY: HResult = Self::E_OUTOFMEMORY;
    pub const DDERR_INVALIDPARAMS: HResult = Self::E_INVALIDARG;
    pub const DDERR_ALREADYINITIALIZED: HResult = make_ddhresult(5);
    pub const DDERR_INVALIDOBJECT: HResult = make_ddhresult(130);
    pub const DDERR_NOTFOUND: HResult = make_ddhresult(255);
    pub const DDERR_SURFACEBUSY: HResult = make_ddhresult(430);
    pub const DDERR_NOPALETTEATTACHED: HResult = make_ddhresult(563);

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::S_OK => "S_OK",
            Self::E_NOTIMPL => "E_NOTIMPL",
            Self::E_POINTER => "E_POINTER",
            Self::E_FAIL => "E_FAIL",
            Self::E_OUTOFMEMORY => "E_OUTOFMEMORY",
            Self::E_INVALIDARG => "DDERR_INVALIDPARAMS",
            Self::DDERR_ALREADYINITIALIZED => "DDERR_ALREADYINITIALIZED",
            Self::DDERR_INVALIDOBJECT => "DDERR_INVALIDOBJECT",
            Self::DDERR_NOTFOUND => "DDERR_NOTFOUND",
            Self::DDERR_SURFACEBUSY => "DDERR_SURFACEBUSY",
            Self::DDERR_NOPALETTEATTACHED => "DDERR_NOPALETTEATTACHED",
            _ => return None,
        })
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directdraw_codes_use_the_ddraw_facility() {
        assert_eq!(HResult::DDERR_INVALIDOBJECT.raw(), 0x8876_0082);
        assert_eq!(HResult::DDERR_NOTFOUND.raw(), 0x8876_00FF);
        assert_eq!(HResult::DDERR_SURFACEBUSY.raw(), 0x8876_01AE);
        assert_eq!(HResult::DDERR_NOPALETTEATTACHED.raw(), 0x8876_0233);
        assert!(!HResult::DDERR_GENERIC.is_success());
        assert!(HResult::DD_OK.is_success());
    }

    #[test]
    fn display_names_known_codes() {
        assert_eq!(HResult::E_POINTER.to_string(), "E_POINTER (0x80004003)");
        assert_eq!(HResult(0x1234).to_string(), "0x00001234");
    }
}
