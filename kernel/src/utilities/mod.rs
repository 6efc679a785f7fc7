// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Utility functions and macros provided by the kernel crate.

mod static_ref;
pub use self::static_ref::StaticRef;

/// The Tock Register Interface.
///
/// This is a re-export of the `tock-registers` crate provided for
/// convenience.
///
/// The Tock Register Interface provides a mechanism for accessing hardware
/// registers and MMIO interfaces, and `LocalRegisterCopy` for manipulating
/// register values obtained through an indirect accessor.
pub mod registers {
    pub use tock_registers::fields::Field;
    pub use tock_registers::interfaces;
    pub use tock_registers::register_bitfields;
    pub use tock_registers::registers::ReadWrite;
    pub use tock_registers::{LocalRegisterCopy, RegisterLongName};
}

/// Re-export of the `tock-cells` crate.
///
/// ```rust,ignore
/// use kernel::utilities::cells::OptionalCell;
/// ```
pub mod cells {
    pub use tock_cells::optional_cell::OptionalCell;
}
