//! Serialized pipeline state.
//!
//! The fixed-function part of a graphics pipeline (topology, rasterizer,
//! depth-stencil, blend, render targets, multisampling) as plain hashable
//! data. Its 32-bit FNV-1a [`hash`] is the `serialized_pipeline_state_hash`
//! folded into every [`PipelineStateSignature`].
//!
//! The hash walks the fields in declaration order and writes fixed-width
//! little-endian values, so it is identical on every platform and run. Do not
//! use `std::hash::Hash` for it: derived hashes are not stable.
//!
//! [`hash`]: SerializedGraphicsPipelineState::hash
//! [`PipelineStateSignature`]: super::signature::PipelineStateSignature

use smallvec::SmallVec;

use crate::utils::hash::{FNV1A_INITIAL_HASH_32, fnv1a_32_seeded};

/// Running FNV-1a 32 over fixed-width values.
#[derive(Debug, Clone, Copy)]
struct StateHasher(u32);

impl StateHasher {
    fn new() -> Self {
        Self(FNV1A_INITIAL_HASH_32)
    }

    fn write_u8(&mut self, value: u8) {
        self.0 = fnv1a_32_seeded(&[value], self.0);
    }

    fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    fn write_u32(&mut self, value: u32) {
        self.0 = fnv1a_32_seeded(&value.to_le_bytes(), self.0);
    }

    fn write_u64(&mut self, value: u64) {
        self.0 = fnv1a_32_seeded(&value.to_le_bytes(), self.0);
    }

    fn finish(self) -> u32 {
        self.0
    }
}

// ─── Enumerations ─────────────────────────────────────────────────────────────

/// Declares a fieldless `u8` enum usable in the state hash.
macro_rules! state_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant),+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            #[inline]
            fn write(self, hasher: &mut StateHasher) {
                hasher.write_u8(self as u8);
            }
        }
    };
}

state_enum!(PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    PatchList,
} default TriangleList);

state_enum!(FillMode { Solid, Wireframe } default Solid);

state_enum!(CullMode { None, Front, Back } default Back);

state_enum!(FrontFace { Ccw, Cw } default Ccw);

state_enum!(CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
} default Always);

state_enum!(BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturated,
    Constant,
    OneMinusConstant,
} default One);

state_enum!(BlendOperation { Add, Subtract, ReverseSubtract, Min, Max } default Add);

state_enum!(StencilOperation {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
} default Keep);

state_enum!(
    /// Render target formats a pipeline can be created for.
    TextureFormat {
        Unknown,
        R8Unorm,
        Rg8Unorm,
        Rgba8Unorm,
        Rgba8UnormSrgb,
        Bgra8Unorm,
        Bgra8UnormSrgb,
        Rgb10a2Unorm,
        Rg11b10Float,
        R16Float,
        Rgba16Float,
        R32Float,
        Rgba32Float,
        Depth16Unorm,
        Depth24Plus,
        Depth24PlusStencil8,
        Depth32Float,
    } default Rgba8Unorm
);

// ─── Sub-states ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterizerKey {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub conservative: bool,
}

impl RasterizerKey {
    fn write(&self, hasher: &mut StateHasher) {
        self.fill_mode.write(hasher);
        self.cull_mode.write(hasher);
        self.front_face.write(hasher);
        hasher.write_bool(self.conservative);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendComponentKey {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl BlendComponentKey {
    /// `src * 1 + dst * 0`
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    fn write(&self, hasher: &mut StateHasher) {
        self.src_factor.write(hasher);
        self.dst_factor.write(hasher);
        self.operation.write(hasher);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateKey {
    pub color: BlendComponentKey,
    pub alpha: BlendComponentKey,
}

impl BlendStateKey {
    pub const ALPHA_BLENDING: Self = Self {
        color: BlendComponentKey {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponentKey {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
    };

    fn write(&self, hasher: &mut StateHasher) {
        self.color.write(hasher);
        self.alpha.write(hasher);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetKey {
    pub format: TextureFormat,
    pub blend: Option<BlendStateKey>,
    /// RGBA write mask bits.
    pub write_mask: u8,
}

impl ColorTargetKey {
    pub const WRITE_ALL: u8 = 0b1111;

    #[must_use]
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: Self::WRITE_ALL,
        }
    }

    fn write(&self, hasher: &mut StateHasher) {
        self.format.write(hasher);
        match &self.blend {
            Some(blend) => {
                hasher.write_bool(true);
                blend.write(hasher);
            }
            None => hasher.write_bool(false),
        }
        hasher.write_u8(self.write_mask);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceKey {
    pub compare: CompareFunction,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

impl Default for StencilFaceKey {
    fn default() -> Self {
        Self {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        }
    }
}

impl StencilFaceKey {
    fn write(&self, hasher: &mut StateHasher) {
        self.compare.write(hasher);
        self.fail_op.write(hasher);
        self.depth_fail_op.write(hasher);
        self.pass_op.write(hasher);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilStateKey {
    pub front: StencilFaceKey,
    pub back: StencilFaceKey,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl StencilStateKey {
    fn write(&self, hasher: &mut StateHasher) {
        self.front.write(hasher);
        self.back.write(hasher);
        hasher.write_u32(self.read_mask);
        hasher.write_u32(self.write_mask);
    }
}

/// Depth bias with its floats stored as bits so the key stays `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DepthBiasKey {
    pub constant: i32,
    pub slope_scale_bits: u32,
    pub clamp_bits: u32,
}

impl DepthBiasKey {
    #[must_use]
    pub fn new(constant: i32, slope_scale: f32, clamp: f32) -> Self {
        Self {
            constant,
            slope_scale_bits: slope_scale.to_bits(),
            clamp_bits: clamp.to_bits(),
        }
    }

    fn write(&self, hasher: &mut StateHasher) {
        hasher.write_u32(self.constant.cast_unsigned());
        hasher.write_u32(self.slope_scale_bits);
        hasher.write_u32(self.clamp_bits);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilKey {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub stencil: StencilStateKey,
    pub bias: DepthBiasKey,
}

impl Default for DepthStencilKey {
    fn default() -> Self {
        Self {
            format: TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Greater,
            stencil: StencilStateKey::default(),
            bias: DepthBiasKey::default(),
        }
    }
}

impl DepthStencilKey {
    fn write(&self, hasher: &mut StateHasher) {
        self.format.write(hasher);
        hasher.write_bool(self.depth_write_enabled);
        self.depth_compare.write(hasher);
        self.stencil.write(hasher);
        self.bias.write(hasher);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultisampleKey {
    pub count: u32,
    pub mask: u64,
    pub alpha_to_coverage_enabled: bool,
}

impl Default for MultisampleKey {
    fn default() -> Self {
        Self {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

impl MultisampleKey {
    fn write(&self, hasher: &mut StateHasher) {
        hasher.write_u32(self.count);
        hasher.write_u64(self.mask);
        hasher.write_bool(self.alpha_to_coverage_enabled);
    }
}

// ─── Serialized Pipeline State ───────────────────────────────────────────────

/// Everything about a graphics pipeline except its shaders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializedGraphicsPipelineState {
    pub topology: PrimitiveTopology,
    pub rasterizer: RasterizerKey,
    pub depth_stencil: Option<DepthStencilKey>,
    pub color_targets: SmallVec<[ColorTargetKey; 2]>,
    pub multisample: MultisampleKey,
}

impl Default for SerializedGraphicsPipelineState {
    fn default() -> Self {
        let mut color_targets = SmallVec::new();
        color_targets.push(ColorTargetKey::new(TextureFormat::Rgba8Unorm));
        Self {
            topology: PrimitiveTopology::TriangleList,
            rasterizer: RasterizerKey::default(),
            depth_stencil: Some(DepthStencilKey::default()),
            color_targets,
            multisample: MultisampleKey::default(),
        }
    }
}

impl SerializedGraphicsPipelineState {
    /// Stable 32-bit FNV-1a hash of the whole state.
    #[must_use]
    pub fn hash(&self) -> u32 {
        let mut hasher = StateHasher::new();
        self.topology.write(&mut hasher);
        self.rasterizer.write(&mut hasher);
        match &self.depth_stencil {
            Some(depth_stencil) => {
                hasher.write_bool(true);
                depth_stencil.write(&mut hasher);
            }
            None => hasher.write_bool(false),
        }
        hasher.write_u32(u32::try_from(self.color_targets.len()).unwrap_or(u32::MAX));
        for target in &self.color_targets {
            target.write(&mut hasher);
        }
        self.multisample.write(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_for_equal_states() {
        let a = SerializedGraphicsPipelineState::default();
        let b = a.clone();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_changes_with_state() {
        let base = SerializedGraphicsPipelineState::default();

        let mut wireframe = base.clone();
        wireframe.rasterizer.fill_mode = FillMode::Wireframe;
        assert_ne!(base.hash(), wireframe.hash());

        let mut blended = base.clone();
        blended.color_targets[0].blend = Some(BlendStateKey::ALPHA_BLENDING);
        assert_ne!(base.hash(), blended.hash());

        let mut no_depth = base.clone();
        no_depth.depth_stencil = None;
        assert_ne!(base.hash(), no_depth.hash());

        let mut msaa = base.clone();
        msaa.multisample.count = 4;
        assert_ne!(base.hash(), msaa.hash());
    }

    #[test]
    fn test_depth_bias_bits() {
        let bias = DepthBiasKey::new(2, 1.5, 0.0);
        assert_eq!(bias.slope_scale_bits, 1.5f32.to_bits());
        assert_eq!(bias, DepthBiasKey::new(2, 1.5, 0.0));
    }
}
