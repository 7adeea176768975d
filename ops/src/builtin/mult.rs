use crate::kernel::KernelImage;
use crate::op::{FixedArityKernel, FixedArityOperation};
use crate::register_op;
use crate::types::RegistrationInfo;


/// "mult": element-wise f32 product of the first two memory objects,
/// written to the third.
pub struct MultKernel;

impl RegistrationInfo for MultKernel {
    const NAME: &'static str = "mult";
}

impl FixedArityKernel for MultKernel {
    const ARITY: usize = 3;
    const IMAGE: KernelImage = KernelImage::new(
        "op_mult",
        include_bytes!(concat!(env!("OUT_DIR"), "/op_mult.comp.spv")),
    );
}

/// Multiplies two tensors into a third: `[lhs, rhs, output]`.
pub type OpMult = FixedArityOperation<MultKernel>;

register_op!(MultKernel);
