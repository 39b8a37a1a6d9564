//! Special functions behind the distribution routines.
//!
//! Loader's saddle-point building blocks (the Stirling error term and the
//! binomial deviance), accurate `log(1+x) − x` and `ln Γ(1+a)` evaluators,
//! log-space arithmetic helpers and the regularized incomplete beta function.
//!
//! All functions are pure and return `f64::NAN` when an argument is NaN.
//!
//! # References
//!
//! - Loader, C. (2000). "Fast and Accurate Computation of Binomial
//!   Probabilities". Technical report, Bell Labs.
//! - Press et al. (2007), *Numerical Recipes*, 3rd ed., §6.4.

use statrs::function::{beta, gamma};
use tracing::debug;

/// ln √(2π)
#[allow(clippy::excessive_precision)]
pub const LN_SQRT_2PI: f64 = 0.918938533204672741780329736406;

/// √(2π)
#[allow(clippy::excessive_precision)]
pub const SQRT_2PI: f64 = 2.50662827463100050241576528481104525301;

/// 1/√(2π) ≈ 0.3989422804014327
#[allow(clippy::excessive_precision)]
pub const FRAC_1_SQRT_2PI: f64 = 0.3989422804014326779399460599343818684758586311649;

/// 2^1023 / π: the point where `2πx` overflows.
#[allow(clippy::excessive_precision)]
const X_LRG: f64 = 2.86111748575702815380240589208115399625e+307;

/// 2^256, rescaling threshold for continued-fraction convergents.
pub(crate) const SCALE_FACTOR: f64 = 1.157_920_892_373_162e77;

// ============================================================================
// Log Gamma / Log Beta
// ============================================================================

/// Natural log of the gamma function, `ln Γ(x)` for `x > 0`.
///
/// Thin seam over `statrs`, which is accurate to near machine precision.
///
/// # Examples
/// ```
/// use u_probdist::special::ln_gamma;
/// // Γ(5) = 24
/// assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-13);
/// ```
pub fn ln_gamma(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    gamma::ln_gamma(x)
}

/// Log of the Beta function: `ln B(a, b) = ln Γ(a) + ln Γ(b) − ln Γ(a+b)`.
///
/// # Examples
/// ```
/// use u_probdist::special::ln_beta;
/// // B(1,1) = 1, so ln B(1,1) = 0
/// assert!(ln_beta(1.0, 1.0).abs() < 1e-12);
/// ```
pub fn ln_beta(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    beta::ln_beta(a, b)
}

// ============================================================================
// Stirling Error
// ============================================================================

/// `stirlerr(n)` for n = 0, 0.5, 1, ..., 15. Entry 0 is a placeholder.
#[allow(clippy::excessive_precision)]
const SFERR_HALVES: [f64; 31] = [
    0.0,
    0.1534264097200273452913848,   // 0.5
    0.0810614667953272582196702,   // 1.0
    0.0548141210519176538961390,   // 1.5
    0.0413406959554092940938221,   // 2.0
    0.03316287351993628748511048,  // 2.5
    0.02767792568499833914878929,  // 3.0
    0.02374616365629749597132920,  // 3.5
    0.02079067210376509311152277,  // 4.0
    0.01848845053267318523077934,  // 4.5
    0.01664469118982119216319487,  // 5.0
    0.01513497322191737887351255,  // 5.5
    0.01387612882307074799874573,  // 6.0
    0.01281046524292022692424986,  // 6.5
    0.01189670994589177009505572,  // 7.0
    0.01110455975820691732662991,  // 7.5
    0.010411265261972096497478567, // 8.0
    0.009799416126158803298389475, // 8.5
    0.009255462182712732917728637, // 9.0
    0.008768700134139385462952823, // 9.5
    0.008330563433362871256469318, // 10.0
    0.007934114564314020547248100, // 10.5
    0.007573675487951840794972024, // 11.0
    0.007244554301320383179543912, // 11.5
    0.006942840107209529865664152, // 12.0
    0.006665247032707682442354394, // 12.5
    0.006408994188004207068439631, // 13.0
    0.006171712263039457647532867, // 13.5
    0.005951370112758847735624416, // 14.0
    0.005746216513010115682023589, // 14.5
    0.005554733551962801371038690, // 15.0
];

/// Error term of Stirling's formula:
/// `stirlerr(n) = ln(n!) − ln(√(2πn) (n/e)ⁿ)`.
///
/// # Algorithm
/// - `n ≤ 15`: exact table for half-integers, otherwise from `ln Γ(n+1)`.
/// - `n > 15`: the asymptotic series `(S0 − S1/n² + S2/n⁴ − …)/n`, using
///   fewer terms as `n` grows (2 above 500, 3 above 80, 4 above 35, else 5).
///
/// # Examples
/// ```
/// use u_probdist::special::stirlerr;
/// assert!((stirlerr(1.0) - 0.08106146679532726).abs() < 1e-16);
/// // ≈ 1/(12n) for large n
/// assert!((stirlerr(1000.0) - 1.0 / 12000.0).abs() < 1e-9);
/// ```
pub fn stirlerr(n: f64) -> f64 {
    const S0: f64 = 1.0 / 12.0;
    const S1: f64 = 1.0 / 360.0;
    const S2: f64 = 1.0 / 1260.0;
    const S3: f64 = 1.0 / 1680.0;
    const S4: f64 = 1.0 / 1188.0;

    if n <= 15.0 {
        let nn = n + n;
        if nn >= 0.0 && nn == nn.trunc() {
            return SFERR_HALVES[nn as usize];
        }
        return ln_gamma(n + 1.0) - (n + 0.5) * n.ln() + n - LN_SQRT_2PI;
    }

    let nn = n * n;
    if n > 500.0 {
        return (S0 - S1 / nn) / n;
    }
    if n > 80.0 {
        return (S0 - (S1 - S2 / nn) / nn) / n;
    }
    if n > 35.0 {
        return (S0 - (S1 - (S2 - S3 / nn) / nn) / nn) / n;
    }
    // 15 < n <= 35
    (S0 - (S1 - (S2 - (S3 - S4 / nn) / nn) / nn) / nn) / n
}

// ============================================================================
// log(1+x) family
// ============================================================================

/// Continued fraction for `Σ xⁿ / (i + n·d)`, the tail sums behind
/// [`log1pmx`] and [`lgamma1p`].
///
/// Iterates until successive convergents agree to relative tolerance `eps`.
/// Convergents are rescaled by 2^±256 to stay in range.
pub fn logcf(x: f64, i: f64, d: f64, eps: f64) -> f64 {
    const MAX_ITER: usize = 10_000;

    if x.is_nan() || i.is_nan() || d.is_nan() || i <= 0.0 || d < 0.0 {
        return f64::NAN;
    }

    let mut c1 = 2.0 * d;
    let mut c2 = i + d;
    let mut c4 = c2 + d;
    let mut a1 = c2;
    let mut b1 = i * (c2 - i * x);
    let mut b2 = d * d * x;
    let mut a2 = c4 * c2 - b2;
    b2 = c4 * b1 - i * b2;

    let mut iter = 0;
    while (a2 * b1 - a1 * b2).abs() > (eps * b1 * b2).abs() {
        if iter == MAX_ITER {
            debug!(x, i, d, "logcf: iteration cap reached");
            break;
        }
        iter += 1;

        let mut c3 = c2 * c2 * x;
        c2 += d;
        c4 += d;
        a1 = c4 * a2 - c3 * a1;
        b1 = c4 * b2 - c3 * b1;

        c3 = c1 * c1 * x;
        c1 += d;
        c4 += d;
        a2 = c4 * a1 - c3 * a2;
        b2 = c4 * b1 - c3 * b2;

        if b2.abs() > SCALE_FACTOR {
            a1 /= SCALE_FACTOR;
            b1 /= SCALE_FACTOR;
            a2 /= SCALE_FACTOR;
            b2 /= SCALE_FACTOR;
        } else if b2.abs() < 1.0 / SCALE_FACTOR {
            a1 *= SCALE_FACTOR;
            b1 *= SCALE_FACTOR;
            a2 *= SCALE_FACTOR;
            b2 *= SCALE_FACTOR;
        }
    }

    a2 / b2
}

/// `log(1+x) − x`, accurate also for small `|x|`.
///
/// # Algorithm
/// With `r = x/(2+x)`, `log(1+x) − x = r(2y·Σ yᵏ/(2k+3) − x)` where `y = r²`.
/// A 4-term power series covers `|x| < 0.01`; [`logcf`] covers the rest of
/// `[-0.79149064, 1]`. Outside that range direct evaluation is exact enough.
///
/// # Examples
/// ```
/// use u_probdist::special::log1pmx;
/// let x = 1e-3_f64;
/// assert!((log1pmx(x) - (x.ln_1p() - x)).abs() < 1e-18);
/// ```
pub fn log1pmx(x: f64) -> f64 {
    const MIN_LOG1_VALUE: f64 = -0.79149064;

    if !(MIN_LOG1_VALUE..=1.0).contains(&x) {
        return x.ln_1p() - x;
    }

    let r = x / (2.0 + x);
    let y = r * r;
    if x.abs() < 1e-2 {
        r * ((((2.0 / 9.0 * y + 2.0 / 7.0) * y + 2.0 / 5.0) * y + 2.0 / 3.0) * y - x)
    } else {
        r * (2.0 * y * logcf(y, 3.0, 2.0, 1e-14) - x)
    }
}

/// `(ζ(i+2) − 1)/(i+2)` for i = 0..40.
#[allow(clippy::excessive_precision)]
const LGAMMA1P_COEFFS: [f64; 40] = [
    0.3224670334241132182362075833230126e-0,
    0.6735230105319809513324605383715000e-1,
    0.2058080842778454787900092413529198e-1,
    0.7385551028673985266273097291406834e-2,
    0.2890510330741523285752988298486755e-2,
    0.1192753911703260977113935692828109e-2,
    0.5096695247430424223356548135815582e-3,
    0.2231547584535793797614188036013401e-3,
    0.9945751278180853371459589003190170e-4,
    0.4492623673813314170020750240635786e-4,
    0.2050721277567069155316650397830591e-4,
    0.9439488275268395903987425104415055e-5,
    0.4374866789907487804181793223952411e-5,
    0.2039215753801366236781900709670839e-5,
    0.9551412130407419832857179772951265e-6,
    0.4492469198764566043294290331193655e-6,
    0.2120718480555466586923135901077628e-6,
    0.1004322482396809960872083050053344e-6,
    0.4769810169363980565760193417246730e-7,
    0.2271109460894316491031998116062124e-7,
    0.1083865921489695409107491757968159e-7,
    0.5183475041970046655121248647057669e-8,
    0.2483674543802478317185008663991718e-8,
    0.1192140140586091207442548202774640e-8,
    0.5731367241678862013330194857961011e-9,
    0.2759522885124233145178149692816341e-9,
    0.1330476437424448948149715720858008e-9,
    0.6422964563838100022082448087644648e-10,
    0.3104424774732227276239215783404066e-10,
    0.1502138408075414217093301048780668e-10,
    0.7275974480239079662504549924814047e-11,
    0.3527742476575915083615072228655483e-11,
    0.1711991790559617908601084114443031e-11,
    0.8315385841420284819798357793954418e-12,
    0.4042200525289440065536008957032895e-12,
    0.1966475631096616490411045679010286e-12,
    0.9573630387838555763782200936508615e-13,
    0.4664076026428374224576492565974577e-13,
    0.2273736960065972320633279596737272e-13,
    0.1109139947083452201658320007192334e-13,
];

/// `ln Γ(1+a)`, accurate also for small `|a|`.
///
/// Plain `ln Γ(a+1)` loses relative precision near its zero at `a = 0`.
/// For `|a| < 0.5` this sums the Taylor series of `ln Γ(1+a)` in terms of
/// `ζ(k) − 1`, closing the tail with [`logcf`].
///
/// # Examples
/// ```
/// use u_probdist::special::lgamma1p;
/// assert!((lgamma1p(0.1) - (-0.04987244125983972)).abs() < 1e-15);
/// assert!((lgamma1p(1e-10) + 5.772156648192862e-11).abs() < 1e-23);
/// ```
pub fn lgamma1p(a: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const EULERS_CONST: f64 = 0.5772156649015328606065120900824024;
    // ζ(N+2) − 1
    #[allow(clippy::excessive_precision)]
    const C: f64 = 0.2273736845824652515226821577978691e-12;
    const N: usize = LGAMMA1P_COEFFS.len();

    if a.abs() >= 0.5 {
        return ln_gamma(a + 1.0);
    }

    let mut lgam = C * logcf(-a / 2.0, (N + 2) as f64, 1.0, 1e-14);
    for &coef in LGAMMA1P_COEFFS.iter().rev() {
        lgam = coef - a * lgam;
    }

    (a * lgam - EULERS_CONST) * a - log1pmx(a)
}

// ============================================================================
// Log-space arithmetic
// ============================================================================

/// `log(1 − exp(x))` for `x ≤ 0`, choosing the stable form on each side
/// of `−ln 2`.
pub fn log1_exp(x: f64) -> f64 {
    if x > -std::f64::consts::LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

/// `log(exp(lx) + exp(ly))` without overflow.
///
/// # Examples
/// ```
/// use u_probdist::special::logspace_add;
/// let s = logspace_add(2.0_f64.ln(), 3.0_f64.ln());
/// assert!((s - 5.0_f64.ln()).abs() < 1e-15);
/// ```
pub fn logspace_add(lx: f64, ly: f64) -> f64 {
    if lx.is_nan() || ly.is_nan() {
        return lx + ly;
    }
    lx.max(ly) + (-(lx - ly).abs()).exp().ln_1p()
}

/// `log(exp(lx) − exp(ly))` for `lx ≥ ly`.
pub fn logspace_sub(lx: f64, ly: f64) -> f64 {
    lx + log1_exp(ly - lx)
}

/// `log(Σ exp(lxᵢ))`, shifted by the maximum term.
///
/// Returns `−∞` for an empty slice.
pub fn logspace_sum(lx: &[f64]) -> f64 {
    match lx {
        [] => f64::NEG_INFINITY,
        [x] => *x,
        [x, y] => logspace_add(*x, *y),
        _ => {
            let mx = lx.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !mx.is_finite() {
                return mx;
            }
            let s: f64 = lx.iter().map(|&v| (v - mx).exp()).sum();
            mx + s.ln()
        }
    }
}

// ============================================================================
// Deviance: bd0 / ebd0
// ============================================================================

/// Deviance term `bd0(x, np) = x·ln(x/np) + np − x`.
///
/// # Algorithm
/// When `|x − np| < 0.1(x + np)` the direct form cancels badly, so the
/// series `Σ 2x·v^(2j+1)/(2j+1)` in `v = (x−np)/(x+np)` is summed instead.
///
/// # Returns
/// `NaN` if either argument is non-finite or `np == 0`.
///
/// # Examples
/// ```
/// use u_probdist::special::bd0;
/// let direct = 10.0 * (10.0_f64 / 3.0).ln() + 3.0 - 10.0;
/// assert!((bd0(10.0, 3.0) - direct).abs() < 1e-13);
/// assert_eq!(bd0(5.0, 5.0), 0.0);
/// ```
pub fn bd0(x: f64, np: f64) -> f64 {
    if !x.is_finite() || !np.is_finite() || np == 0.0 {
        return f64::NAN;
    }

    if (x - np).abs() < 0.1 * (x + np) {
        let mut v = (x - np) / (x + np);
        let mut s = (x - np) * v;
        if s.abs() < f64::MIN_POSITIVE {
            return s;
        }
        let mut ej = 2.0 * x * v;
        v *= v;
        for j in 1..1000_i32 {
            ej *= v;
            let s1 = s + ej / f64::from(2 * j + 1);
            if s1 == s {
                return s1;
            }
            s = s1;
        }
    }

    x * (x / np).ln() + np - x
}

/// Deviance `x·ln(x/M) + M − x` as an unevaluated double-double sum.
///
/// `hi` accumulates integer-rounded parts and `lo` the residuals, so
/// `hi + lo` carries more precision than a single `f64` would.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bd0 {
    /// Leading part.
    pub hi: f64,
    /// Residual.
    pub lo: f64,
}

impl Bd0 {
    fn leading(hi: f64) -> Self {
        Self { hi, lo: 0.0 }
    }

    /// Collapses the pair into a single `f64`.
    pub fn value(self) -> f64 {
        self.hi + self.lo
    }

    fn add(&mut self, d: f64) {
        let d1 = (d + 0.5).floor();
        self.hi += d1;
        self.lo += d - d1;
    }
}

/// `ln(f/1024)` for f = 2048 down to 1024, each split over four `f32`
/// pieces. Row 0 is `ln 2`, the last row is zero.
#[allow(clippy::excessive_precision)]
const BD0_SCALE: [[f64; 4]; 129] = [
    [0.6931471824645996, -1.9046542121259336e-09, -8.78318373858934e-17, 3.061840738529369e-24],
    [0.6853040456771851, -4.2578264469739224e-08, -1.1723105396588968e-15, 6.20339263720161e-23],
    [0.6773988008499146, 2.274189014883632e-08, 1.4411920431605914e-15, 7.046384546650164e-23],
    [0.6699305772781372, -4.8293856025338755e-08, -8.664795531738382e-16, 7.049557660755325e-24],
    [0.6624060869216919, -4.791602492559832e-08, -2.161508226230938e-15, 7.092968360825275e-23],
    [0.6548244953155518, 6.237715233226027e-09, 1.1806699607549086e-16, 6.660323533535123e-25],
    [0.6471850872039795, -4.220866856030625e-08, -1.3817589176253094e-15, -1.1159932395766606e-23],
    [0.6400018930435181, -4.979170142860312e-08, 4.887013763907625e-16, 1.6847465694533583e-23],
    [0.6327667236328125, -5.406177194799966e-08, -2.7224545250006775e-15, -2.9070780223955397e-23],
    [0.6249561309814453, 3.285935434860221e-08, 1.201672936775467e-16, -8.668233185091897e-24],
    [0.6181373596191406, -6.406189467789147e-11, 3.550580962335878e-18, -3.623679406748965e-25],
    [0.6107416152954102, 4.229853800552519e-08, 1.548143293520366e-15, -5.446353118719766e-23],
    [0.6032907962799072, 5.515817491641428e-08, 2.1193636784238266e-15, 1.247109826410663e-22],
    [0.5963221788406372, 3.28135385530004e-09, -1.4033469816541837e-16, 5.544061982643074e-24],
    [0.5893045663833618, 4.307998580088679e-08, -3.2446651600595306e-15, -2.569782398567476e-23],
    [0.5822374820709229, -3.983067387025585e-08, 2.9387905513776885e-15, 1.6124430498687833e-22],
    [0.5751199722290039, 2.242384056216906e-09, -2.204516403537114e-17, 4.078543753751354e-25],
    [0.5685046911239624, 4.422870603093543e-08, 2.7879957109977287e-16, -9.741708794029408e-24],
    [0.5618454217910767, 2.147161382026752e-08, 1.3374919170106156e-15, -2.326922260336506e-23],
    [0.554580807685852, 4.57783499996367e-09, 2.633145912141026e-16, 2.070995903387998e-23],
    [0.5478278398513794, -7.667999568639061e-09, 6.199095327775322e-16, 6.341979011056023e-24],
    [0.5410289764404297, -3.7302321231891256e-08, -3.3801781496424835e-15, 1.4469198371142414e-22],
    [0.5347557067871094, 4.382891916066001e-08, -8.601820749692393e-16, -8.775950563978016e-24],
    [0.5278670787811279, 1.0839714903454478e-08, -4.480281248130319e-16, 3.8840996084516777e-23],
    [0.5215104818344116, 4.2031594205127476e-08, 1.211009992711288e-15, -2.3206744819671555e-23],
    [0.5145297050476074, -1.2322940889930578e-08, 2.820084495413274e-16, 1.880026562185923e-23],
    [0.5080875158309937, -1.2297126872340414e-08, -4.295835588700959e-16, -1.8036626177499945e-23],
    [0.5016034841537476, 5.9145378372704727e-08, 1.2728561033550608e-15, -5.824094430019416e-23],
    [0.4950772523880005, 1.4409851090135817e-08, -6.381910184083422e-17, -3.500509376717118e-25],
    [0.48910707235336304, 2.745798610703787e-08, -1.4470418644525664e-15, 4.211866896949939e-23],
    [0.4824984669685364, 1.762245460668055e-08, 4.128675224747099e-16, 2.6082691866392177e-23],
    [0.4764525294303894, -1.2470243504481004e-08, -9.162193924794196e-17, 3.765782542240376e-24],
    [0.469759464263916, -5.450353945946063e-09, -4.304846960468561e-16, 2.074710343707083e-25],
    [0.46363574266433716, -1.7013046527125653e-09, 7.601622738878589e-18, -2.0415879231895994e-25],
    [0.4574742913246155, 6.943684516258486e-10, -2.5461310777374286e-17, 5.5412533419976475e-25],
    [0.4512746334075928, 1.0731865174307131e-08, 6.374000219845047e-16, 3.901547318408994e-23],
    [0.44503629207611084, 2.8650656958006948e-08, -9.155352545558342e-16, -4.7365878254772817e-23],
    [0.43938833475112915, 2.6186132373595683e-08, 1.3619601577579505e-15, -5.2672794844240613e-23],
    [0.4330751895904541, 1.9065733880552216e-08, 1.014319201479946e-15, 1.0145670737413337e-22],
    [0.42735910415649414, -1.141359362577532e-08, 1.3242044582274781e-16, -1.0240055893684678e-23],
    [0.42096930742263794, -1.2778508917676845e-08, 6.143525731270704e-16, 1.419242178938019e-23],
    [0.4151833653450012, -7.767916088141646e-09, 5.955443124124071e-16, 2.732668133771502e-23],
    [0.4093637466430664, 1.8807551072086426e-09, 1.9153331349462894e-16, -5.6208063158075e-24],
    [0.40351009368896484, -2.0416603518924603e-08, -2.93405013148838e-16, 1.894346911970581e-24],
    [0.39762192964553833, 1.0016001361634608e-09, 2.2863242352463633e-17, 9.458133611770764e-25],
    [0.3916988968849182, 1.545909711353488e-08, 1.0962823446210085e-15, 3.108302239821126e-23],
    [0.3864043951034546, -2.076412375373593e-09, 1.5073464810114547e-16, 7.412449454375094e-24],
    [0.38041436672210693, -8.244395388601333e-09, 1.4866224964678982e-16, -3.927292740683968e-24],
    [0.3743882179260254, 9.158529934438775e-09, 5.656919067358501e-16, 3.4213474905617904e-23],
    [0.36900103092193604, -2.2253590969967263e-08, 6.231405399548338e-16, -2.1564751355837555e-23],
    [0.36358463764190674, -2.6778728567933285e-08, -9.943908455716573e-16, -4.704929732945495e-24],
    [0.35745590925216675, -2.033036139437172e-08, -1.5794492077344114e-15, 6.318678032068057e-23],
    [0.3519763946533203, 2.850385882879891e-08, -9.566434575519799e-16, -6.409595040255684e-24],
    [0.3464667797088623, -1.236265312343221e-08, -6.003368248279719e-16, -2.860901497105794e-24],
    [0.3409265875816345, -6.110413286464222e-10, 1.7467136243918857e-17, 1.9962587429804357e-25],
    [0.3353555202484131, 2.167272583619706e-08, -1.0918773497788125e-15, -3.047574780704126e-23],
    [0.33045530319213867, -1.608884048209802e-08, -3.833435008838916e-16, -7.683741875124221e-24],
    [0.3248254060745239, 2.801670362373443e-08, -2.0725720961098414e-16, 1.3160777896524739e-23],
    [0.3191636800765991, 2.6222629401218e-08, -1.3995222573204161e-15, 8.599883909680833e-23],
    [0.31418323516845703, 2.6826626253750874e-08, -9.792556373536439e-16, 2.2954960929108544e-23],
    [0.3084607720375061, 1.368350943664609e-08, 5.591995050742643e-16, -1.1938701403427125e-23],
    [0.3034266233444214, -8.629042369534545e-09, -5.222554219259392e-16, 3.228770766379237e-23],
    [0.2983669638633728, 8.688424202318856e-09, 2.764116793423446e-16, -1.0171858868428321e-23],
    [0.29255300760269165, -4.91631446664087e-09, 2.562284723960507e-16, -2.6341575505102177e-23],
    [0.28743791580200195, -1.3782395669181824e-08, 7.29039351877645e-16, -4.431977943282236e-24],
    [0.28229647874832153, 2.3770866164340987e-08, 6.449228392264254e-16, 3.417536976845211e-23],
    [0.27712851762771606, 1.4733029018998423e-08, 6.793364114448283e-16, 3.593898034032222e-24],
    [0.27193373441696167, -1.8933320689029642e-08, 7.77939410955583e-16, 2.591972424742619e-23],
    [0.2667117714881897, 1.4300387263244119e-11, -7.458876800955772e-19, 4.247418782257993e-26],
    [0.2622140049934387, 7.802219315067305e-09, 5.022431038767539e-16, -2.4063174816868367e-23],
    [0.25694090127944946, 2.9618050234603288e-08, 7.279528203645545e-16, 2.638556081145549e-23],
    [0.2516399025917053, -6.44787778725231e-09, 4.122028133693521e-16, 7.427559296153698e-24],
    [0.2470736801624298, -1.9981829524340355e-09, -1.0909757890855787e-16, 6.236552089808213e-24],
    [0.24171993136405945, 5.523085988556886e-09, -2.686547633696265e-16, -2.764495989170092e-24],
    [0.23710808157920837, 1.0085374313462125e-08, -4.775626813761317e-16, 2.330620598032363e-23],
    [0.231700599193573, -1.3946383603524737e-08, 1.0970921279709183e-17, 3.229909378627549e-25],
    [0.22704219818115234, -6.451284839670279e-09, -4.2529947798112047e-16, -1.0260254677162862e-23],
    [0.2223619818687439, 1.4110645096820917e-08, 6.025568981827254e-16, 1.9385180739531644e-23],
    [0.21765980124473572, -8.286782815503102e-09, 5.232363919579781e-16, 5.078443538654066e-23],
    [0.21214580535888672, -8.254218641923217e-09, 3.255553133321774e-16, 1.571430013634162e-23],
    [0.20739519596099854, -1.6149279691290985e-09, 2.1131592679643073e-17, 1.4275617427027514e-24],
    [0.20262190699577332, 8.597639933327628e-09, -3.3804619056798137e-16, 2.5623235609364303e-24],
    [0.19782572984695435, 1.348296585490516e-08, -3.2024568730231384e-16, -2.5712252251631252e-23],
    [0.1930064558982849, 9.956859781112826e-10, 9.001674563844606e-17, -3.754797654135173e-24],
    [0.1889725625514984, 4.2415360113068346e-09, 3.8086815297465933e-16, -2.1147402916208568e-23],
    [0.18411031365394592, 6.931054841174955e-09, -3.4784858522920016e-16, 2.4665943434547742e-23],
    [0.17922431230545044, 5.0739235035734964e-09, 3.2221329189922637e-16, -1.0379009008973928e-23],
    [0.17431432008743286, 3.794385250444066e-09, 3.190066898587176e-16, 2.0292714723890484e-23],
    [0.17020416259765625, 3.4223344158590407e-09, -1.8846416901959178e-16, 1.1415315069779235e-23],
    [0.16524958610534668, -1.3210039284672348e-08, -2.3213954359040806e-16, 3.043054213286757e-24],
    [0.1602703034877777, 6.007922159767531e-09, -7.521047737154288e-17, -1.2649106048711768e-25],
    [0.15610191226005554, -1.2301535790015805e-08, 3.0175617567361414e-16, -8.633806506327147e-24],
    [0.15191605687141418, -1.4845571882915465e-08, -3.265830289949929e-16, -1.5268151962784823e-23],
    [0.14686977863311768, -4.6748995785605985e-09, -4.294291341758996e-16, 1.328295982896899e-23],
    [0.142645001411438, 9.186472027522541e-09, -8.049373155998929e-16, 1.437998766909278e-23],
    [0.1384023129940033, 9.86511672351753e-09, -8.837306496940929e-16, 7.295324909194215e-24],
    [0.1332872211933136, 9.990350768873668e-10, 3.316946610734358e-17, 2.7351440526086287e-24],
    [0.129004567861557, -7.46120853989396e-09, -6.212113165383437e-16, 1.855187264989731e-24],
    [0.12470348179340363, -3.2924463155836747e-09, -7.404120132741752e-17, 1.3246955625609024e-24],
    [0.12038381397724152, 3.3791991427278845e-09, 1.6214981996371606e-16, -6.00070673940474e-24],
    [0.11604541540145874, 3.5638392237302696e-10, -7.354219635108878e-18, 7.794312440645008e-26],
    [0.11168810725212097, 3.136765958089427e-09, -8.994406293238225e-19, -7.920937558182207e-26],
    [0.10731174051761627, -4.728527791542092e-09, -4.2976339455270984e-16, 5.351143287258107e-24],
    [0.10291612148284912, 2.8332007850906393e-09, 4.925742757234052e-17, 2.794436810397303e-24],
    [0.09850110113620758, 4.970725164810119e-09, 4.130512756847049e-16, 6.313449560595865e-25],
    [0.09406651556491852, -6.525850970717784e-09, -1.3492816627243298e-16, -9.079650179574527e-24],
    [0.08961215615272522, 2.5369617517867482e-09, 1.6110664594961319e-16, -5.189504504486964e-24],
    [0.08603434264659882, -5.304795713811927e-09, 5.127575488441481e-17, 1.463615545692133e-24],
    [0.08154398202896118, 2.0112156384755053e-09, 8.065769331577608e-17, -3.0150319017810437e-24],
    [0.07703337073326111, 5.7495661565099e-09, -2.503851097302985e-16, -1.846143093040508e-23],
    [0.07250232994556427, 1.177662634077592e-09, -3.525476857925506e-17, 1.3164077898906505e-24],
    [0.0688626617193222, -7.043545302565235e-09, 2.49712406751501e-16, 1.0686882487619963e-23],
    [0.06429435312747955, -2.422082090447475e-09, -2.0555896149129847e-16, 8.602907613530545e-24],
    [0.0606246218085289, 7.905943261166115e-12, -8.270443345471096e-19, -2.3533820836754142e-26],
    [0.056018441915512085, -5.139745296034448e-10, -3.811651571366802e-17, 1.9072195442219776e-24],
    [0.052318163216114044, -3.5574325707443677e-09, 9.191155834145393e-17, -5.321463973420977e-24],
    [0.04767347127199173, -1.8026349302147082e-09, 1.0329634289704177e-16, -2.2283569301283993e-24],
    [0.04394212365150452, -1.795005699634089e-09, -5.3817402974104447e-17, -1.3996196977941442e-24],
    [0.040196798741817474, 3.8451930528538014e-10, -2.4485452721520977e-17, -7.386769024377949e-26],
    [0.0354953333735466, -3.5901653872016936e-10, -2.073207767866976e-17, -2.412097216555168e-26],
    [0.0317181795835495, 6.87235046648027e-10, -6.430478093749473e-18, 1.3508692031871337e-25],
    [0.02792670577764511, 7.568773385813188e-10, -4.22031585165944e-17, 2.534760563692782e-24],
    [0.02412080392241478, -1.1255707477175747e-09, 4.89700584100947e-17, 1.4172214525647275e-24],
    [0.01934296265244484, 1.9068610579431322e-10, -1.0635946218849709e-17, -5.300489542457734e-25],
    [0.015504186972975731, -4.3701048335620385e-10, 6.61106154763715e-18, 2.5398086818405174e-25],
    [0.01165061630308628, 9.168890091615367e-10, -1.5848697818454755e-17, -1.350491609984469e-24],
    [0.007782140746712685, -3.046577434773212e-10, 7.793435996762285e-18, 4.660100148208369e-25],
    [0.0038986406289041042, -2.1324678134426733e-10, 1.2541658163801307e-19, 8.745035431740123e-27],
    [0.0, 0.0, 0.0, 0.0],
];

/// Splits `v > 0` into `(r, e)` with `v = r · 2^e` and `r ∈ [0.5, 1)`.
fn frexp(v: f64) -> (f64, i32) {
    const EXP_MASK: u64 = 0x7ff << 52;
    let (v, adjust) = if v.abs() < f64::MIN_POSITIVE {
        (v * 2f64.powi(54), -54)
    } else {
        (v, 0)
    };
    let bits = v.to_bits();
    let exp = ((bits & EXP_MASK) >> 52) as i32 - 1022;
    let mantissa = f64::from_bits((bits & !EXP_MASK) | (1022_u64 << 52));
    (mantissa, exp + adjust)
}

/// `x · 2^e` without overflowing the intermediate power.
fn ldexp(x: f64, e: i32) -> f64 {
    if e > 1023 {
        x * 2f64.powi(1023) * 2f64.powi(e - 1023)
    } else if e < -1022 {
        x * 2f64.powi(-1022) * 2f64.powi(e + 1022)
    } else {
        x * 2f64.powi(e)
    }
}

/// High-precision deviance `x·ln(x/M) + M − x`.
///
/// # Algorithm
/// `M/x` is written as `r·2^e` and `r` is matched to the nearest of 128
/// table points `f/1024`. With `fg = f·2^-(e+10)` the deviance splits into
/// `−x·log1pmx((M·fg − x)/x)`, the tabulated `x·ln(fg)`, and `M − M·fg`.
/// Each piece is accumulated into a [`Bd0`] pair.
///
/// # Edge cases
/// `x == M → 0`, `x == 0 → M`, `M == 0 → +∞`, and `+∞` on overflow.
///
/// # Examples
/// ```
/// use u_probdist::special::ebd0;
/// let d = ebd0(1000.0, 1001.0);
/// let direct = 1000.0 * (1000.0_f64 / 1001.0).ln() + 1.0;
/// assert!((d.value() - direct).abs() < 1e-12);
/// ```
pub fn ebd0(x: f64, m: f64) -> Bd0 {
    const SB: i32 = 10;
    const S: f64 = (1 << SB) as f64;
    const N: f64 = 128.0;

    if x.is_nan() || m.is_nan() {
        return Bd0::leading(x + m);
    }
    if x == m {
        return Bd0::default();
    }
    if x == 0.0 {
        return Bd0::leading(m);
    }
    if m == 0.0 {
        return Bd0::leading(f64::INFINITY);
    }
    if (m / x).is_infinite() {
        return Bd0::leading(m);
    }

    let (r, e) = frexp(m / x);

    // prevent later overflow
    if std::f64::consts::LN_2 * f64::from(-e) > 1.0 + f64::MAX / x {
        return Bd0::leading(f64::INFINITY);
    }

    let i = ((r - 0.5) * (2.0 * N) + 0.5).floor() as usize;
    let f = (S / (0.5 + i as f64 / (2.0 * N)) + 0.5).floor();
    let fg = ldexp(f, -(e + SB));
    if fg.is_infinite() {
        return Bd0::leading(fg);
    }

    let mut acc = Bd0::default();
    acc.add(-x * log1pmx((m * fg - x) / x));
    if fg == 1.0 {
        return acc;
    }

    for (&scale, &ln2) in BD0_SCALE[i].iter().zip(&BD0_SCALE[0]) {
        acc.add(x * scale); // x * ln(fg * 2^e)
        acc.add(-x * f64::from(e) * ln2); // x * ln(2^-e)
        if !acc.hi.is_finite() {
            return Bd0::leading(f64::INFINITY);
        }
    }

    acc.add(m);
    acc.add(-m * fg);
    acc
}

// ============================================================================
// Poisson saddle point
// ============================================================================

/// Poisson probability `λˣ e^{−λ} / Γ(x+1)` for real `x ≥ 0`, optionally on
/// log scale.
///
/// # Algorithm
/// Loader's saddle point form `exp(−stirlerr(x) − bd0(x, λ)) / √(2πx)` with
/// the deviance from [`ebd0`]. Degenerate regimes are handled first:
/// `λ = 0` is a point mass at 0, `x` negligible against `λ` gives `e^{−λ}`,
/// and `λ` negligible against `x` uses the plain log form.
///
/// # Examples
/// ```
/// use u_probdist::special::dpois_raw;
/// let p = dpois_raw(3.0, 1.2, false);
/// let direct = 1.2_f64.powi(3) * (-1.2_f64).exp() / 6.0;
/// assert!((p - direct).abs() < 1e-15);
/// ```
pub fn dpois_raw(x: f64, lambda: f64, log_p: bool) -> f64 {
    let (zero, one) = if log_p {
        (f64::NEG_INFINITY, 0.0)
    } else {
        (0.0, 1.0)
    };
    let d_exp = |v: f64| if log_p { v } else { v.exp() };

    if lambda == 0.0 {
        return if x == 0.0 { one } else { zero };
    }
    if !lambda.is_finite() || x < 0.0 {
        return zero;
    }
    if x <= lambda * f64::MIN_POSITIVE {
        return d_exp(-lambda);
    }
    if lambda < x * f64::MIN_POSITIVE {
        if !x.is_finite() {
            return zero;
        }
        return d_exp(-lambda + x * lambda.ln() - ln_gamma(x + 1.0));
    }

    let Bd0 { hi, lo } = ebd0(x, lambda);
    let lo = lo + stirlerr(x);

    let large_x = x >= X_LRG;
    let r = if large_x {
        SQRT_2PI * x.sqrt()
    } else {
        std::f64::consts::TAU * x
    };

    if log_p {
        -lo - hi - if large_x { r.ln() } else { 0.5 * r.ln() }
    } else {
        (-lo).exp() * (-hi).exp() / if large_x { r } else { r.sqrt() }
    }
}

// ============================================================================
// Regularized Incomplete Beta Function
// ============================================================================

/// Regularized incomplete beta function I_x(a, b).
///
/// # Definition
/// ```text
/// I_x(a, b) = B(x; a, b) / B(a, b)
/// ```
///
/// # Algorithm
/// Continued fraction (Lentz's method) with the symmetry relation
/// `I_x(a,b) = 1 − I_{1−x}(b,a)` chosen so the fraction converges fast.
///
/// # Examples
/// ```
/// use u_probdist::special::regularized_incomplete_beta;
/// assert_eq!(regularized_incomplete_beta(0.0, 2.0, 3.0), 0.0);
/// assert_eq!(regularized_incomplete_beta(1.0, 2.0, 3.0), 1.0);
/// assert!((regularized_incomplete_beta(0.5, 1.0, 1.0) - 0.5).abs() < 1e-14);
/// ```
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    incomplete_beta_xy(x, 0.5 - x + 0.5, a, b)
}

/// Upper tail `1 − I_x(a, b)`, evaluated as `I_{1−x}(b, a)`.
///
/// ```
/// use u_probdist::special::regularized_incomplete_beta_upper;
/// // 1 − I_x(1, 2) = (1 − x)²
/// let x = 0.999_999;
/// let v = regularized_incomplete_beta_upper(x, 1.0, 2.0);
/// assert!((v / ((1.0 - x) * (1.0 - x)) - 1.0).abs() < 1e-9);
/// ```
pub fn regularized_incomplete_beta_upper(x: f64, a: f64, b: f64) -> f64 {
    incomplete_beta_xy(0.5 - x + 0.5, x, b, a)
}

/// I_x(a, b) where the caller also supplies `y = 1 − x` exactly, so neither
/// tail suffers from forming `1 − x` in floating point.
pub(crate) fn incomplete_beta_xy(x: f64, y: f64, a: f64, b: f64) -> f64 {
    if x.is_nan() || y.is_nan() || a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if y <= 0.0 {
        return 1.0;
    }

    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - beta_cf_term(y, x, b, a);
    }
    beta_cf_term(x, y, a, b)
}

/// `xᵃ yᵇ / (a B(a,b))` times the continued fraction.
fn beta_cf_term(x: f64, y: f64, a: f64, b: f64) -> f64 {
    let ln_prefix = a * x.ln() + b * y.ln() - ln_beta(a, b);
    (ln_prefix.exp() / a) * beta_cf(x, a, b)
}

/// Continued fraction for the incomplete beta function (Lentz's algorithm).
fn beta_cf(x: f64, a: f64, b: f64) -> f64 {
    // Large shapes need O(√max(a,b)) terms.
    const MAX_ITER: usize = 20_000;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - (a + b) * x / (a + 1.0));
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m_f = m as f64;
        let num_even = m_f * (b - m_f) * x / ((a + 2.0 * m_f - 1.0) * (a + 2.0 * m_f));
        d = 1.0 / guard(1.0 + num_even * d);
        c = guard(1.0 + num_even / c);
        h *= d * c;

        let num_odd =
            -(a + m_f) * (a + b + m_f) * x / ((a + 2.0 * m_f) * (a + 2.0 * m_f + 1.0));
        d = 1.0 / guard(1.0 + num_odd * d);
        c = guard(1.0 + num_odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            return h;
        }
    }

    debug!(x, a, b, "incomplete beta continued fraction did not converge");
    h
}
