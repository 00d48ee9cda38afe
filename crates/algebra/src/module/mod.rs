mod builder;
mod finite_dimensional_module;
mod module_trait;
mod sum_module;
mod tensor_module;

pub mod free_module;
pub mod homomorphism;

pub use builder::{ActionRelation, FDModuleBuilder};
pub use finite_dimensional_module::FDModule;
pub use free_module::{FreeModule, OperationGeneratorPair};
pub use module_trait::Module;
pub use sum_module::SumModule;
pub use tensor_module::TensorModule;
