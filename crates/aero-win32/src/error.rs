use aero_win32_mem::GuestMemoryError;
use aero_win32_pixel::PixelError;
use thiserror::Error;

use crate::handle::{Handle, HandleError};
use crate::host::StubError;
use crate::hresult::HResult;
use crate::trampoline::TrampolineError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Win32Error {
    /// Bad pointer, size or handle argument from guest code.
    #[error("{entry}: invalid argument, returning {status}")]
    InvalidArgument { entry: &'static str, status: HResult },
    /// The call was well formed but cannot succeed in the current state.
    #[error("{entry} failed with {status}")]
    Failed { entry: &'static str, status: HResult },
    /// A capability or flag combination the engine does not model.
    #[error("{entry}: unsupported configuration: {detail}")]
    Unsupported { entry: &'static str, detail: String },
    #[error("{entry}: unknown object {handle}")]
    UnknownHandle { entry: &'static str, handle: Handle },
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error(transparent)]
    Pixel(#[from] PixelError),
    #[error(transparent)]
    Memory(#[from] GuestMemoryError),
    #[error(transparent)]
    Stub(#[from] StubError),
    #[error(transparent)]
    Trampoline(#[from] TrampolineError),
}

pub type Result<T> = std::result::Result<T, Win32Error>;

/// What the guest-facing boundary does with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return the status code to guest code and keep running.
    Status(HResult),
    /// Stop the process.
    Fatal,
}

impl Win32Error {
    pub fn disposition(&self) -> Disposition {
        use Disposition::{Fatal, Status};

        match self {
            Win32Error::InvalidArgument { status, .. } | Win32Error::Failed { status, .. } => {
                Status(*status)
            }
            Win32Error::Unsupported { .. } => Fatal,
            Win32Error::UnknownHandle { .. } => Status(HResult::DDERR_INVALIDOBJECT),
            Win32Error::NotImplemented(_) => Status(HResult::DDERR_GENERIC),
            Win32Error::Handle(err) => match err {
                HandleError::InvalidHandle(_) | HandleError::WrongKind { .. } => {
                    Status(HResult::DDERR_INVALIDOBJECT)
                }
                HandleError::NameInUse { .. } => Status(HResult::DDERR_GENERIC),
                HandleError::Exhausted => Status(HResult::DDERR_OUTOFMEMORY),
            },
            Win32Error::Pixel(err) => match err {
                // Only hit when drawing into a palettized surface.
                PixelError::UnsupportedDepth(_) | PixelError::NotImplemented(_) => Fatal,
                PixelError::MissingPalette { .. } => Status(HResult::DDERR_NOPALETTEATTACHED),
                PixelError::PaletteTooLarge(_) | PixelError::SizeMismatch { .. } => {
                    Status(HResult::DDERR_INVALIDPARAMS)
                }
                PixelError::TooLarge { .. } => Status(HResult::DDERR_OUTOFMEMORY),
                PixelError::Memory(err) => memory_status(err),
            },
            Win32Error::Memory(err) => memory_status(err),
            Win32Error::Stub(_) | Win32Error::Trampoline(_) => Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.disposition() == Disposition::Fatal
    }
}

fn memory_status(err: &GuestMemoryError) -> Disposition {
    Disposition::Status(match err {
        GuestMemoryError::OutOfRange { .. } => HResult::DDERR_INVALIDPARAMS,
        GuestMemoryError::Exhausted { .. } => HResult::DDERR_OUTOFMEMORY,
        GuestMemoryError::UnknownAllocation { .. } => HResult::DDERR_GENERIC,
    })
}
