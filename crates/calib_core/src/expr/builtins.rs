//! Whitelisted functions and constants of the expression language.
//!
//! Names follow the array-library conventions calibration expressions are
//! usually written in (`arcsin`, `absolute`, `minimum`, ...). Each may be
//! qualified with `np.` or `numpy.`.

/// Function implementation.
#[derive(Clone, Copy)]
pub(crate) enum Builtin {
    /// Element-wise unary function
    Unary(fn(f64) -> f64),
    /// Element-wise binary function with broadcasting
    Binary(fn(f64, f64) -> f64),
    /// `linear_interp(xp, fp, x)`: piecewise linear interpolation through
    /// `(xp, fp)` with linear extrapolation
    LinearInterp,
}

impl Builtin {
    pub(crate) fn arity(self) -> usize {
        match self {
            Builtin::Unary(_) => 1,
            Builtin::Binary(_) => 2,
            Builtin::LinearInterp => 3,
        }
    }
}

const NAMESPACES: [&str; 2] = ["np", "numpy"];

const UNARY: &[(&str, fn(f64) -> f64)] = &[
    ("sqrt", f64::sqrt),
    ("cbrt", f64::cbrt),
    ("exp", f64::exp),
    ("expm1", f64::exp_m1),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("log2", f64::log2),
    ("log1p", f64::ln_1p),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("arcsin", f64::asin),
    ("arccos", f64::acos),
    ("arctan", f64::atan),
    ("sinh", f64::sinh),
    ("cosh", f64::cosh),
    ("tanh", f64::tanh),
    ("arcsinh", f64::asinh),
    ("arccosh", f64::acosh),
    ("arctanh", f64::atanh),
    ("abs", f64::abs),
    ("absolute", f64::abs),
    ("floor", f64::floor),
    ("ceil", f64::ceil),
    ("sign", sign),
    ("square", square),
];

const BINARY: &[(&str, fn(f64, f64) -> f64)] = &[
    ("power", f64::powf),
    ("arctan2", f64::atan2),
    ("hypot", f64::hypot),
    ("minimum", minimum),
    ("maximum", maximum),
];

const CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn square(x: f64) -> f64 {
    x * x
}

// NaN propagates, unlike f64::min / f64::max
fn minimum(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn maximum(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Split `np.name` / `numpy.name` into the bare name.
///
/// Returns `None` for any other dotted name; unqualified names are returned
/// unchanged.
pub(crate) fn strip_namespace(name: &str) -> Option<&str> {
    match name.split_once('.') {
        None => Some(name),
        Some((ns, rest)) if NAMESPACES.contains(&ns) && !rest.contains('.') => Some(rest),
        Some(_) => None,
    }
}

/// Whether `name` is a math namespace (`np`, `numpy`).
pub(crate) fn is_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

/// Resolve a (possibly qualified) function name.
pub(crate) fn lookup_function(name: &str) -> Option<Builtin> {
    let name = strip_namespace(name)?;
    if name == "linear_interp" {
        return Some(Builtin::LinearInterp);
    }
    UNARY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| Builtin::Unary(*f))
        .or_else(|| {
            BINARY
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, f)| Builtin::Binary(*f))
        })
}

/// Resolve a (possibly qualified) constant name.
pub(crate) fn lookup_constant(name: &str) -> Option<f64> {
    let name = strip_namespace(name)?;
    CONSTANTS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

/// Whether `name` is reserved by the language and cannot be assigned to.
pub(crate) fn is_reserved(name: &str) -> bool {
    matches!(name, "x" | "y" | "p")
        || is_namespace(name)
        || lookup_function(name).is_some()
        || lookup_constant(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_stripping() {
        assert_eq!(strip_namespace("sqrt"), Some("sqrt"));
        assert_eq!(strip_namespace("np.sqrt"), Some("sqrt"));
        assert_eq!(strip_namespace("numpy.pi"), Some("pi"));
        assert_eq!(strip_namespace("os.system"), None);
        assert_eq!(strip_namespace("np.linalg.inv"), None);
    }

    #[test]
    fn test_lookup_function() {
        assert!(matches!(lookup_function("np.exp"), Some(Builtin::Unary(_))));
        assert!(matches!(lookup_function("arctan2"), Some(Builtin::Binary(_))));
        assert!(matches!(lookup_function("linear_interp"), Some(Builtin::LinearInterp)));
        assert!(lookup_function("eval").is_none());
        assert!(lookup_function("__import__").is_none());
    }

    #[test]
    fn test_lookup_constant() {
        assert_eq!(lookup_constant("pi"), Some(std::f64::consts::PI));
        assert_eq!(lookup_constant("np.e"), Some(std::f64::consts::E));
        assert!(lookup_constant("tau").is_none());
    }

    #[test]
    fn test_numeric_conventions() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
        assert!(minimum(f64::NAN, 1.0).is_nan());
        assert_eq!(maximum(2.0, 1.0), 2.0);
        assert_eq!(square(-3.0), 9.0);
    }

    #[test]
    fn test_reserved_names() {
        for name in ["x", "y", "p", "np", "numpy", "sqrt", "pi"] {
            assert!(is_reserved(name), "{} should be reserved", name);
        }
        assert!(!is_reserved("slope"));
    }
}
