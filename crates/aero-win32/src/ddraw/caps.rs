use bitflags::bitflags;

bitflags! {
    /// `DDSCAPS_*`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct SurfaceCaps: u32 {
        const ALPHA = 0x0000_0002;
        const BACKBUFFER = 0x0000_0004;
        const COMPLEX = 0x0000_0008;
        const FLIP = 0x0000_0010;
        const FRONTBUFFER = 0x0000_0020;
        const OFFSCREENPLAIN = 0x0000_0040;
        const OVERLAY = 0x0000_0080;
        const PALETTE = 0x0000_0100;
        const PRIMARYSURFACE = 0x0000_0200;
        const PRIMARYSURFACELEFT = 0x0000_0400;
        const SYSTEMMEMORY = 0x0000_0800;
        const TEXTURE = 0x0000_1000;
        const THREE_D_DEVICE = 0x0000_2000;
        const VIDEOMEMORY = 0x0000_4000;
        const VISIBLE = 0x0000_8000;
        const WRITEONLY = 0x0001_0000;
        const ZBUFFER = 0x0002_0000;
        const OWNDC = 0x0004_0000;
        const LIVEVIDEO = 0x0008_0000;
        const HWCODEC = 0x0010_0000;
        const MODEX = 0x0020_0000;
        const MIPMAP = 0x0040_0000;
        const ALLOCONLOAD = 0x0400_0000;
        const VIDEOPORT = 0x0800_0000;
        const LOCALVIDMEM = 0x1000_0000;
        const NONLOCALVIDMEM = 0x2000_0000;
        const STANDARDVGAMODE = 0x4000_0000;
        const OPTIMIZED = 0x8000_0000;
    }
}

impl SurfaceCaps {
    /// Bits a creation request may carry.
    pub const CREATABLE: SurfaceCaps = SurfaceCaps::PRIMARYSURFACE
        .union(SurfaceCaps::OFFSCREENPLAIN)
        .union(SurfaceCaps::COMPLEX)
        .union(SurfaceCaps::FLIP)
        .union(SurfaceCaps::SYSTEMMEMORY)
        .union(SurfaceCaps::VIDEOMEMORY)
        .union(SurfaceCaps::LOCALVIDMEM)
        .union(SurfaceCaps::VISIBLE)
        .union(SurfaceCaps::PALETTE)
        .union(SurfaceCaps::FRONTBUFFER)
        .union(SurfaceCaps::BACKBUFFER)
        .union(SurfaceCaps::WRITEONLY)
        .union(SurfaceCaps::OWNDC);
}

bitflags! {
    /// `DDLOCK_*`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct LockFlags: u32 {
        const WAIT = 0x0000_0001;
        const EVENT = 0x0000_0002;
        const READONLY = 0x0000_0010;
        const WRITEONLY = 0x0000_0020;
        const NOSYSLOCK = 0x0000_0800;
        const NOOVERWRITE = 0x0000_1000;
        const DISCARDCONTENTS = 0x0000_2000;
    }
}

impl LockFlags {
    pub const UNSUPPORTED: LockFlags = LockFlags::EVENT
        .union(LockFlags::NOSYSLOCK)
        .union(LockFlags::NOOVERWRITE)
        .union(LockFlags::DISCARDCONTENTS);
}

bitflags! {
    /// `DDSD_*`: which descriptor fields are valid.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct DescFlags: u32 {
        const CAPS = 0x0000_0001;
        const HEIGHT = 0x0000_0002;
        const WIDTH = 0x0000_0004;
        const PITCH = 0x0000_0008;
        const BACKBUFFERCOUNT = 0x0000_0020;
        const ZBUFFERBITDEPTH = 0x0000_0040;
        const ALPHABITDEPTH = 0x0000_0080;
        const LPSURFACE = 0x0000_0800;
        const PIXELFORMAT = 0x0000_1000;
        const CKDESTOVERLAY = 0x0000_2000;
        const CKDESTBLT = 0x0000_4000;
        const CKSRCOVERLAY = 0x0000_8000;
        const CKSRCBLT = 0x0001_0000;
        const MIPMAPCOUNT = 0x0002_0000;
        const REFRESHRATE = 0x0004_0000;
        const LINEARSIZE = 0x0008_0000;
        const TEXTURESTAGE = 0x0010_0000;
    }
}

bitflags! {
    /// `DDPF_*`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct PixelFormatFlags: u32 {
        const ALPHAPIXELS = 0x0000_0001;
        const ALPHA = 0x0000_0002;
        const FOURCC = 0x0000_0004;
        const PALETTEINDEXED4 = 0x0000_0008;
        const PALETTEINDEXED8 = 0x0000_0020;
        const RGB = 0x0000_0040;
    }
}

bitflags! {
    /// `DDBLTFAST_*`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct BltFastFlags: u32 {
        const SRCCOLORKEY = 0x0000_0001;
        const DESTCOLORKEY = 0x0000_0002;
        const WAIT = 0x0000_0010;
        const DONOTWAIT = 0x0000_0020;
    }
}

bitflags! {
    /// `DDPCAPS_*`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct PaletteCaps: u32 {
        const FOURBIT = 0x0000_0001;
        const EIGHTBITENTRIES = 0x0000_0002;
        const EIGHTBIT = 0x0000_0004;
        const INITIALIZE = 0x0000_0008;
        const PRIMARYSURFACE = 0x0000_0010;
        const PRIMARYSURFACELEFT = 0x0000_0020;
        const ALLOW256 = 0x0000_0040;
        const VSYNC = 0x0000_0080;
        const ONEBIT = 0x0000_0100;
        const TWOBIT = 0x0000_0200;
        const ALPHA = 0x0000_0400;
    }
}

bitflags! {
    /// Per-surface bookkeeping: which interface generation created it.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceFlags: u32 {
        /// `GetCaps` fills a four-dword `DDSCAPS2`.
        const CAPS2 = 0x1;
        /// The mirrored descriptor is a `DDSURFACEDESC2`.
        const DESC2 = 0x2;
    }
}
