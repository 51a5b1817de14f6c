//! Operator boilerplate for single-field newtypes.

/// Implements a `std::ops` trait for a tuple newtype by delegating to the wrapped value.
///
/// ```ignore
/// op!(binary Points, Add, add);
/// op!(inplace Points, AddAssign, add_assign);
/// op!(unary Points, Neg, neg);
/// ```
#[macro_export]
macro_rules! op {
    (binary $t:ty, $imp:ident, $method:ident) => {
        impl std::ops::$imp for $t {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$imp::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $t:ty, $imp:ident, $method:ident) => {
        impl std::ops::$imp for $t {
            fn $method(&mut self, rhs: Self) {
                std::ops::$imp::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $t:ty, $imp:ident, $method:ident) => {
        impl std::ops::$imp for $t {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$imp::$method(self.0))
            }
        }
    };
}
