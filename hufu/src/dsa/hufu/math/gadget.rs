use alloc::vec::Vec;

use rand_core::RngCore;

use super::center_mod;
use crate::dsa::hufu::{ParameterSet, SMALL_MODULUS};

/// Number of stream bytes consumed per coordinate by [round_to_gadget].
pub const GADGET_BYTES_PER_COORDINATE: usize = 9;

/// Offset of the coset tables: a count of `i` entries above the uniform value encodes
/// `k = i - COSET_OFFSET`.
const COSET_OFFSET: i64 = 13;

/// Reverse cumulative tables of `k ~ D_{Z, r, -c/q}` for the cosets `c = 0..=q/2`, scaled by
/// `2^72`: entry `i` of table `c` is `floor(2^72 * P(k > i - 13))`.
#[rustfmt::skip]
const COSET_RCDT: [[u128; 26]; 9] = [
    [
        4722366482869645213694,
        4722366482869645211489,
        4722366482869643670030,
        4722366482869033926947,
        4722366482732573104636,
        4722366465453705157611,
        4722365227601522004300,
        4722315054784225839843,
        4721164481225879148338,
        4706236314048902749385,
        4596652909091541626757,
        4141529377126674984089,
        3072080592220658660600,
        1650285890648986553095,
        580837105742970229606,
        125713573778103586938,
        16130168820742464310,
        1202001643766065357,
        51428085419373852,
        1255268123209395,
        17415940056084,
        137072109059,
        611286748,
        1543665,
        2206,
        1,
    ],
    [
        4722366482869645213693,
        4722366482869645210317,
        4722366482869642932574,
        4722366482868773451978,
        4722366482680988242169,
        4722366459734878158774,
        4722364873370454617066,
        4722302823189789635334,
        4720929637278954136488,
        4703736234899592078117,
        4581938134410889608474,
        4093774522969709115041,
        2986802892262234872772,
        1566588927884375229523,
        535687203734512486211,
        112310504040592223477,
        13935935590017638999,
        1003362931895338004,
        41455647253659614,
        976840646346322,
        13081780002739,
        99371436504,
        427688266,
        1042299,
        1437,
        1,
    ],
    [
        4722366482869645213691,
        4722366482869645208533,
        4722366482869641850299,
        4722366482868404744961,
        4722366482610565774941,
        4722366452206152002976,
        4722364423725309137069,
        4722287855005366878966,
        4720652627955068995751,
        4700894265932989685430,
        4565820809236070376079,
        4043382170032620175177,
        2900117547374141137168,
        1484635257703953251154,
        493099650637748190611,
        100130562156504080177,
        12014584526457111518,
        835734279598545095,
        33343716187023304,
        758494014638764,
        9804483917713,
        71880351304,
        298569064,
        702209,
        934,
        0,
    ],
    [
        4722366482869645213688,
        4722366482869645205826,
        4722366482869640265550,
        4722366482867884011893,
        4722366482514644313080,
        4722366442317243725449,
        4722363854267415257283,
        4722269579928136760735,
        4720326634687218682674,
        4697671125675981594135,
        4548208266050190344824,
        3990330632326170993172,
        2812207148740721887187,
        1404575977645174264666,
        453022638026742787509,
        89087825846501929568,
        10336067021222633829,
        694599916687816991,
        26760288695908416,
        587653796976272,
        7331966391289,
        51879392382,
        207968399,
        472035,
        606,
        0,
    ],
    [
        4722366482869645213684,
        4722366482869645201725,
        4722366482869637950271,
        4722366482867150229820,
        4722366482384286896423,
        4722366429357772597615,
        4722363134716527303891,
        4722247318497645615688,
        4719943878874744541810,
        4694024148239482799969,
        4529006522390863828660,
        3934609828811516297962,
        2723262641705982708028,
        1326549931738575138428,
        415396038762818129964,
        79099354992867667161,
        8873079763352619497,
        576045500066884077,
        21429578755469458,
        454288387996169,
        5470838322078,
        37360747559,
        144538957,
        316605,
        392,
        0,
    ],
    [
        4722366482869645213678,
        4722366482869645195529,
        4722366482869634575325,
        4722366482866118568693,
        4722366482207532219364,
        4722366412412909536142,
        4722362227586935423621,
        4722220263320975282145,
        4719495511950616376305,
        4689907150326027886915,
        4508120847922720094337,
        3876221955803197133928,
        2633482086054508732375,
        1250683046613617323930,
        380152316438424570079,
        70085461823625515843,
        7600892513950087321,
        476687355992179063,
        17123087996896410,
        350414592477314,
        4073097873105,
        26845539945,
        100232247,
        211882,
        253,
        0,
    ],
    [
        4722366482869645213668,
        4722366482869645186185,
        4722366482869629666806,
        4722366482864671380862,
        4722366481968409355908,
        4722366390307402800210,
        4722361086589111005902,
        4722187457504949171883,
        4718971497045388265874,
        4685270315583791127151,
        4485456390165325937194,
        3815182075679862257041,
        2543069334693610124902,
        1177087803821132324791,
        347217446100444035830,
        61969926350573436473,
        6497175677126901147,
        393608545428085908,
        13651983085241604,
        269695036869061,
        3025751309218,
        19247067247,
        69352953,
        141483,
        163,
        0,
    ],
    [
        4722366482869645213652,
        4722366482869645172128,
        4722366482869622543949,
        4722366482862645889286,
        4722366481645644593692,
        4722366361535122555209,
        4722359654705584811937,
        4722147769964535934643,
        4718360482281963338782,
        4680060100008463915641,
        4460918856494604982162,
        3751518610722206100851,
        2452232645407185137109,
        1105862850827478735160,
        316511835130542477049,
        54680159978831143289,
        5541829567355274122,
        324301331730798473,
        10860609322628362,
        207111265622634,
        2242739874260,
        13768693944,
        47880353,
        94265,
        105,
        0,
    ],
    [
        4722366482869645213628,
        4722366482869645151029,
        4722366482869612231118,
        4722366482859817406634,
        4722366481210968503016,
        4722366324170616056205,
        4722357861881430773295,
        4722099867253097965158,
        4717649665867677813617,
        4674219162261073516095,
        4434415249003001775690,
        3685273731721932883199,
        2361183241434822606848,
        1037092751147712330496,
        287951233866643438005,
        48147320608571697600,
        4716817001967400078,
        266615616547248537,
        8620988214440400,
        158699029157490,
        1658676710679,
        9827807061,
        32982577,
        62666,
        67,
        0,
    ],
];

/// Gadget rounding of one syndrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetSample {
    /// Integer vector with `p * z` close to the syndrome modulo `Q`.
    pub z: Vec<i64>,
    /// `v - p * z`, centered modulo `Q`, in `[-p/2, p/2)`.
    pub error: Vec<i64>,
}

/// Rounds every coordinate of `v` (entries in `[0, Q)`) to the gadget lattice `p * Z`.
///
/// For `h = round(v_i / p)` and `c = h mod q`, the output `z_i = c + q * k` has `k` drawn from the
/// discrete Gaussian of width `r` conditioned on the coset, so `z_i = h (mod q)` and `z` follows a
/// discrete Gaussian of width `q * r` centered at zero. Cosets above `q / 2` reuse the table of
/// `q - c` and mirror the result.
pub fn round_to_gadget<P: ParameterSet, R: RngCore>(v: &[u32], rng: &mut R) -> GadgetSample {
    let p = P::GADGET_BASE;
    let q = SMALL_MODULUS;
    let mut z = Vec::with_capacity(v.len());
    let mut error = Vec::with_capacity(v.len());

    for &v_i in v {
        debug_assert!(v_i < P::MODULUS);
        let h = (v_i + p / 2) / p;
        let c = h % q;
        let (table, mirrored) = if c <= q / 2 { (c, false) } else { (q - c, true) };

        let mut bytes = [0_u8; 16];
        rng.fill_bytes(&mut bytes[..GADGET_BYTES_PER_COORDINATE]);
        let u = u128::from_le_bytes(bytes);
        let count = COSET_RCDT[table as usize].iter().filter(|&&t| u < t).count() as i64;
        let k = count - COSET_OFFSET;
        let k = if mirrored { -k - 1 } else { k };

        let z_i = c as i64 + q as i64 * k;
        z.push(z_i);
        error.push(center_mod(v_i as i64 - p as i64 * z_i, P::MODULUS));
    }

    GadgetSample { z, error }
}

// TESTS
// ================================================================================================
