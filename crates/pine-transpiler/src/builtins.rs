//! builtins.rs — Registre des fonctions intégrées
//!
//! 🍃 Table fixe : nom du script (plat `sma` ou pointé `ta.sma`) → membre du
//! runtime JS (`pinescript.sma`), avec arité et convention vis-à-vis de `na`.
//!
//! API clé :
//! - `lookup(name)` → `Option<&Builtin>` (exact, puis en minuscules)
//! - `is_namespace(root)` → préfixe réservé (`ta`, `array`, `color`…)
//! - `prelude_source()` → le prélude JS embarqué
//! - `runtime_members()` → membres `pinescript.X` définis par le prélude
//! - `namespace_aliases()` → `array.push` ⇒ `pinescript.array.push` (objets de façade)
//!
//! Les formules numériques vivent dans le prélude, pas ici : le générateur
//! n'a besoin que des noms, des arités et de la politique `na`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;

/// Racine de l'objet runtime dans le code émis.
pub const RUNTIME_ROOT: &str = "pinescript";

/// Comportement d'une builtin face à un argument `na` (`null`/`undefined`/`NaN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Un argument `na` donne `na` : le runtime enveloppe la fonction.
    Propagate,
    /// La fonction traite `na` elle-même (tracés, tableaux, `nz`…).
    Handles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    /// Nom côté script.
    pub name: &'static str,
    /// Chemin sous `pinescript.` (peut être pointé : `color.new`).
    pub target: &'static str,
    pub min_args: usize,
    /// `None` : variadique.
    pub max_args: Option<usize>,
    pub policy: NullPolicy,
}

impl Builtin {
    /// Expression JS appelée : `pinescript.<target>`.
    pub fn runtime_name(&self) -> String {
        format!("{RUNTIME_ROOT}.{}", self.target)
    }

    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_args && self.max_args.map_or(true, |max| argc <= max)
    }

    /// `2`, `1..3`, `1+` pour les messages.
    pub fn arity_hint(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{max}", self.min_args),
            None => format!("{}+", self.min_args),
        }
    }
}

const fn handles(name: &'static str, target: &'static str, min_args: usize, max: usize) -> Builtin {
    Builtin { name, target, min_args, max_args: Some(max), policy: NullPolicy::Handles }
}

const fn handles_variadic(name: &'static str, target: &'static str, min_args: usize) -> Builtin {
    Builtin { name, target, min_args, max_args: None, policy: NullPolicy::Handles }
}

const fn propagates(name: &'static str, target: &'static str, min_args: usize, max: usize) -> Builtin {
    Builtin { name, target, min_args, max_args: Some(max), policy: NullPolicy::Propagate }
}

const fn propagates_variadic(name: &'static str, target: &'static str, min_args: usize) -> Builtin {
    Builtin { name, target, min_args, max_args: None, policy: NullPolicy::Propagate }
}

/* ───────────────────────── Table ───────────────────────── */

static BUILTINS: &[Builtin] = &[
    // Valeurs manquantes
    handles("na", "na", 1, 1),
    handles("nz", "nz", 1, 2),
    handles("fixnan", "fixnan", 1, 1),
    // Tracés, alertes, métadonnées
    handles_variadic("plot", "plot", 1),
    handles_variadic("plotshape", "plotshape", 1),
    handles_variadic("plotchar", "plotchar", 1),
    handles_variadic("plotarrow", "plotarrow", 1),
    handles_variadic("plotbar", "plotbar", 4),
    handles_variadic("plotcandle", "plotcandle", 4),
    handles_variadic("hline", "hline", 1),
    handles_variadic("bgcolor", "bgcolor", 1),
    handles_variadic("barcolor", "barcolor", 1),
    handles_variadic("fill", "fill", 2),
    handles("alert", "alert", 1, 2),
    handles("alertcondition", "alertcondition", 1, 3),
    handles_variadic("indicator", "indicator", 0),
    handles_variadic("strategy", "strategy", 0),
    handles_variadic("study", "indicator", 0),
    handles("max_bars_back", "maxBarsBack", 2, 2),
    // ta.* — moyennes et oscillateurs
    propagates("ta.sma", "sma", 2, 2),
    propagates("ta.ema", "ema", 2, 2),
    propagates("ta.wma", "wma", 2, 2),
    propagates("ta.vwma", "vwma", 2, 2),
    propagates("ta.rma", "rma", 2, 2),
    propagates("ta.hma", "hma", 2, 2),
    propagates("ta.alma", "alma", 4, 5),
    propagates("ta.linreg", "linreg", 3, 3),
    propagates("ta.highest", "highest", 1, 2),
    propagates("ta.lowest", "lowest", 1, 2),
    propagates("ta.highestbars", "highestbars", 1, 2),
    propagates("ta.lowestbars", "lowestbars", 1, 2),
    propagates("ta.atr", "atr", 1, 1),
    propagates("ta.rsi", "rsi", 2, 2),
    propagates("ta.roc", "roc", 2, 2),
    propagates("ta.mom", "mom", 2, 2),
    propagates("ta.change", "change", 1, 2),
    propagates("ta.macd", "macd", 4, 4),
    propagates("ta.bb", "bb", 3, 3),
    propagates("ta.kc", "kc", 3, 4),
    propagates("ta.stoch", "stoch", 4, 4),
    propagates("ta.cci", "cci", 2, 2),
    propagates("ta.mfi", "mfi", 2, 2),
    propagates("ta.stdev", "stdev", 2, 3),
    propagates("ta.variance", "variance", 2, 3),
    propagates("ta.dev", "dev", 2, 2),
    propagates("ta.correlation", "correlation", 3, 3),
    propagates("ta.percentrank", "percentrank", 2, 2),
    propagates("ta.cum", "cum", 1, 1),
    propagates("ta.vwap", "vwap", 1, 3),
    propagates("ta.supertrend", "supertrend", 2, 2),
    propagates("ta.dmi", "dmi", 2, 2),
    handles("ta.tr", "tr", 0, 1),
    // ta.* — conditions
    handles("ta.crossover", "crossover", 2, 2),
    handles("ta.crossunder", "crossunder", 2, 2),
    handles("ta.cross", "cross", 2, 2),
    handles("ta.rising", "rising", 2, 2),
    handles("ta.falling", "falling", 2, 2),
    handles("ta.valuewhen", "valuewhen", 3, 3),
    handles("ta.barssince", "barssince", 1, 1),
    handles("ta.pivothigh", "pivothigh", 2, 3),
    handles("ta.pivotlow", "pivotlow", 2, 3),
    // Noms plats historiques (avant les espaces de noms)
    propagates("sma", "sma", 2, 2),
    propagates("ema", "ema", 2, 2),
    propagates("wma", "wma", 2, 2),
    propagates("vwma", "vwma", 2, 2),
    propagates("rma", "rma", 2, 2),
    propagates("hma", "hma", 2, 2),
    propagates("alma", "alma", 4, 5),
    propagates("linreg", "linreg", 3, 3),
    propagates("highest", "highest", 1, 2),
    propagates("lowest", "lowest", 1, 2),
    propagates("highestbars", "highestbars", 1, 2),
    propagates("lowestbars", "lowestbars", 1, 2),
    propagates("atr", "atr", 1, 1),
    propagates("rsi", "rsi", 2, 2),
    propagates("roc", "roc", 2, 2),
    propagates("mom", "mom", 2, 2),
    propagates("change", "change", 1, 2),
    propagates("macd", "macd", 4, 4),
    propagates("stoch", "stoch", 4, 4),
    propagates("cci", "cci", 2, 2),
    propagates("mfi", "mfi", 2, 2),
    propagates("stdev", "stdev", 2, 3),
    propagates("variance", "variance", 2, 3),
    propagates("dev", "dev", 2, 2),
    propagates("correlation", "correlation", 3, 3),
    propagates("percentrank", "percentrank", 2, 2),
    propagates("cum", "cum", 1, 1),
    propagates("vwap", "vwap", 1, 3),
    handles("crossover", "crossover", 2, 2),
    handles("crossunder", "crossunder", 2, 2),
    handles("cross", "cross", 2, 2),
    handles("rising", "rising", 2, 2),
    handles("falling", "falling", 2, 2),
    handles("valuewhen", "valuewhen", 3, 3),
    handles("barssince", "barssince", 1, 1),
    handles("pivothigh", "pivothigh", 2, 3),
    handles("pivotlow", "pivotlow", 2, 3),
    // math.*
    propagates("math.abs", "abs", 1, 1),
    propagates("math.sqrt", "sqrt", 1, 1),
    propagates("math.exp", "exp", 1, 1),
    propagates("math.log", "log", 1, 1),
    propagates("math.log10", "log10", 1, 1),
    propagates("math.sin", "sin", 1, 1),
    propagates("math.cos", "cos", 1, 1),
    propagates("math.tan", "tan", 1, 1),
    propagates("math.asin", "asin", 1, 1),
    propagates("math.acos", "acos", 1, 1),
    propagates("math.atan", "atan", 1, 1),
    propagates("math.floor", "floor", 1, 1),
    propagates("math.ceil", "ceil", 1, 1),
    propagates("math.sign", "sign", 1, 1),
    propagates("math.round", "round", 1, 2),
    propagates("math.pow", "pow", 2, 2),
    propagates("math.sum", "sum", 2, 2),
    propagates("math.todegrees", "todegrees", 1, 1),
    propagates("math.toradians", "toradians", 1, 1),
    propagates_variadic("math.max", "max", 1),
    propagates_variadic("math.min", "min", 1),
    propagates_variadic("math.avg", "avg", 1),
    handles("math.random", "random", 0, 3),
    propagates("abs", "abs", 1, 1),
    propagates("sqrt", "sqrt", 1, 1),
    propagates("exp", "exp", 1, 1),
    propagates("log", "log", 1, 1),
    propagates("log10", "log10", 1, 1),
    propagates("sin", "sin", 1, 1),
    propagates("cos", "cos", 1, 1),
    propagates("tan", "tan", 1, 1),
    propagates("asin", "asin", 1, 1),
    propagates("acos", "acos", 1, 1),
    propagates("atan", "atan", 1, 1),
    propagates("floor", "floor", 1, 1),
    propagates("ceil", "ceil", 1, 1),
    propagates("sign", "sign", 1, 1),
    propagates("round", "round", 1, 2),
    propagates("pow", "pow", 2, 2),
    propagates("sum", "sum", 2, 2),
    propagates_variadic("max", "max", 1),
    propagates_variadic("min", "min", 1),
    propagates_variadic("avg", "avg", 1),
    // array.*
    handles("array.new", "arrayNew", 0, 2),
    handles("array.new_float", "arrayNew", 0, 2),
    handles("array.new_int", "arrayNew", 0, 2),
    handles("array.new_bool", "arrayNew", 0, 2),
    handles("array.new_string", "arrayNew", 0, 2),
    handles("array.new_color", "arrayNew", 0, 2),
    handles("array.new_label", "arrayNew", 0, 2),
    handles("array.new_line", "arrayNew", 0, 2),
    handles("array.new_box", "arrayNew", 0, 2),
    handles("array.new_table", "arrayNew", 0, 2),
    handles_variadic("array.from", "arrayFrom", 0),
    handles("array.size", "arraySize", 1, 1),
    handles("array.get", "arrayGet", 2, 2),
    handles("array.set", "arraySet", 3, 3),
    handles("array.push", "arrayPush", 2, 2),
    handles("array.pop", "arrayPop", 1, 1),
    handles("array.shift", "arrayShift", 1, 1),
    handles("array.unshift", "arrayUnshift", 2, 2),
    handles("array.insert", "arrayInsert", 3, 3),
    handles("array.remove", "arrayRemove", 2, 2),
    handles("array.clear", "arrayClear", 1, 1),
    handles("array.fill", "arrayFill", 2, 4),
    handles("array.sort", "arraySort", 1, 2),
    handles("array.reverse", "arrayReverse", 1, 1),
    handles("array.slice", "arraySlice", 3, 3),
    handles("array.copy", "arrayCopy", 1, 1),
    handles("array.concat", "arrayConcat", 2, 2),
    handles("array.join", "arrayJoin", 1, 2),
    handles("array.contains", "arrayContains", 2, 2),
    handles("array.includes", "arrayContains", 2, 2),
    handles("array.indexof", "arrayIndexOf", 2, 2),
    handles("array.lastindexof", "arrayLastIndexOf", 2, 2),
    handles("array.first", "arrayFirst", 1, 1),
    handles("array.last", "arrayLast", 1, 1),
    handles("array.sum", "arraySum", 1, 1),
    handles("array.avg", "arrayAvg", 1, 1),
    handles("array.min", "arrayMin", 1, 2),
    handles("array.max", "arrayMax", 1, 2),
    handles("array.stdev", "arrayStdev", 1, 2),
    handles("array.variance", "arrayVariance", 1, 2),
    handles("array.covariance", "arrayCovariance", 2, 3),
    // matrix.*
    handles("matrix.new", "matrixNew", 0, 3),
    handles("matrix.rows", "matrixRows", 1, 1),
    handles("matrix.columns", "matrixCols", 1, 1),
    handles("matrix.get", "matrixGet", 3, 3),
    handles("matrix.set", "matrixSet", 4, 4),
    handles("matrix.fill", "matrixFill", 2, 6),
    handles("matrix.sum", "matrixSum", 1, 2),
    handles("matrix.avg", "matrixAvg", 1, 1),
    handles("matrix.min", "matrixMin", 1, 1),
    handles("matrix.max", "matrixMax", 1, 1),
    handles("matrix.transpose", "matrixTranspose", 1, 1),
    handles("matrix.mult", "matrixMult", 2, 2),
    handles("matrix.inv", "matrixInv", 1, 1),
    // map.*
    handles("map.new", "mapNew", 0, 0),
    handles("map.size", "mapSize", 1, 1),
    handles("map.get", "mapGet", 2, 2),
    handles("map.put", "mapPut", 3, 3),
    handles("map.remove", "mapRemove", 2, 2),
    handles("map.keys", "mapKeys", 1, 1),
    handles("map.values", "mapValues", 1, 1),
    handles("map.contains", "mapContains", 2, 2),
    handles("map.clear", "mapClear", 1, 1),
    // str.*
    propagates("str.length", "strLength", 1, 1),
    propagates("str.substring", "strSubstring", 2, 3),
    propagates("str.contains", "strContains", 2, 2),
    propagates("str.startswith", "strStartsWith", 2, 2),
    propagates("str.endswith", "strEndsWith", 2, 2),
    propagates("str.replace", "strReplace", 3, 4),
    propagates("str.replace_all", "strReplaceAll", 3, 3),
    propagates("str.lower", "strLower", 1, 1),
    propagates("str.upper", "strUpper", 1, 1),
    propagates("str.trim", "strTrim", 1, 1),
    propagates("str.split", "strSplit", 2, 2),
    propagates("str.match", "strMatch", 2, 2),
    propagates("str.pos", "strPos", 2, 2),
    propagates("str.repeat", "strRepeat", 2, 3),
    handles("str.tonumber", "strToNumber", 1, 1),
    handles("str.tostring", "strToString", 1, 2),
    handles_variadic("str.format", "strFormat", 1),
    handles("tostring", "strToString", 1, 2),
    handles("tonumber", "strToNumber", 1, 1),
    // color.*
    handles("color.new", "color.new", 2, 2),
    handles("color.rgb", "color.rgb", 3, 4),
    handles("color.from_gradient", "color.from_gradient", 5, 5),
    handles("color.r", "color.r", 1, 1),
    handles("color.g", "color.g", 1, 1),
    handles("color.b", "color.b", 1, 1),
    handles("color.t", "color.t", 1, 1),
    // table.*
    handles_variadic("table.new", "table.new", 3),
    handles_variadic("table.cell", "table.cell", 4),
    handles("table.cell_set_text", "table.cell_set_text", 4, 4),
    handles("table.delete", "table.delete", 1, 1),
    handles("table.clear", "table.clear", 1, 5),
    // label.* / line.* / box.*
    handles_variadic("label.new", "labelNew", 0),
    handles("label.delete", "labelDelete", 1, 1),
    handles("label.set_text", "labelSetText", 2, 2),
    handles("label.settext", "labelSetText", 2, 2),
    handles("label.get_text", "labelGetText", 1, 1),
    handles("label.set_xy", "labelSetXY", 3, 3),
    handles("label.set_x", "labelSetX", 2, 2),
    handles("label.set_y", "labelSetY", 2, 2),
    handles("label.set_color", "labelSetColor", 2, 2),
    handles_variadic("line.new", "lineNew", 2),
    handles("line.delete", "lineDelete", 1, 1),
    handles("line.set_xy1", "lineSetXY1", 3, 3),
    handles("line.set_xy2", "lineSetXY2", 3, 3),
    handles("line.set_x2", "lineSetX2", 2, 2),
    handles("line.set_color", "lineSetColor", 2, 2),
    handles("line.get_price", "lineGetPrice", 2, 2),
    handles("line.get_y1", "lineGetY1", 1, 1),
    handles("line.get_y2", "lineGetY2", 1, 1),
    handles_variadic("box.new", "boxNew", 2),
    handles("box.delete", "boxDelete", 1, 1),
    handles("box.set_left", "boxSetLeft", 2, 2),
    handles("box.set_right", "boxSetRight", 2, 2),
    handles("box.set_top", "boxSetTop", 2, 2),
    handles("box.set_bottom", "boxSetBottom", 2, 2),
    handles("box.get_top", "boxGetTop", 1, 1),
    handles("box.get_bottom", "boxGetBottom", 1, 1),
    // strategy.*
    handles_variadic("strategy.entry", "strategyEntry", 2),
    handles_variadic("strategy.exit", "strategyExit", 1),
    handles_variadic("strategy.order", "strategyOrder", 2),
    handles_variadic("strategy.close", "strategyClose", 1),
    handles_variadic("strategy.close_all", "strategyCloseAll", 0),
    handles("strategy.cancel", "strategyCancel", 1, 1),
    handles("strategy.cancel_all", "strategyCancelAll", 0, 0),
    // request.*
    handles_variadic("request.security", "requestSecurity", 3),
    // input / input.*
    handles_variadic("input", "input", 1),
    handles_variadic("input.int", "input.int", 1),
    handles_variadic("input.float", "input.float", 1),
    handles_variadic("input.bool", "input.bool", 1),
    handles_variadic("input.string", "input.string", 1),
    handles_variadic("input.source", "input.source", 1),
    handles_variadic("input.color", "input.color", 1),
    handles_variadic("input.timeframe", "input.timeframe", 1),
    handles_variadic("input.session", "input.session", 1),
    handles_variadic("input.symbol", "input.symbol", 1),
    handles_variadic("input.price", "input.price", 1),
    handles_variadic("input.text_area", "input.text_area", 1),
    handles_variadic("input.time", "input.time", 1),
    // Temps
    handles("year", "year", 1, 2),
    handles("month", "month", 1, 2),
    handles("weekofyear", "weekofyear", 1, 2),
    handles("dayofmonth", "dayofmonth", 1, 2),
    handles("dayofweek", "dayofweek", 1, 2),
    handles("hour", "hour", 1, 2),
    handles("minute", "minute", 1, 2),
    handles("second", "second", 1, 2),
    handles("timestamp", "timestamp", 1, 7),
    handles("timeframe.in_seconds", "timeframe.in_seconds", 0, 1),
];

/// Préfixes réservés : un identifiant non déclaré portant ce nom désigne
/// l'espace de noms du runtime (`color.red` → `pinescript.color.red`).
pub const NAMESPACES: &[&str] = &[
    "ta", "math", "array", "matrix", "map", "str", "color", "table", "label", "line", "box", "input",
    "strategy", "request", "position", "location", "shape", "size", "text", "barmerge", "syminfo",
    "barstate", "timeframe", "extend", "xloc", "yloc", "display", "format", "dayofweek", "hline", "plot",
    "alert", "order", "font", "session", "currency", "scale",
];

static INDEX: Lazy<HashMap<&'static str, &'static Builtin>> = Lazy::new(|| {
    let mut idx = HashMap::with_capacity(BUILTINS.len());
    for b in BUILTINS {
        idx.entry(b.name).or_insert(b);
    }
    idx
});

static MEMBERS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| scan_members(prelude_source()));

/// Résolution exacte, puis insensible à la casse.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    if let Some(b) = INDEX.get(name) {
        return Some(*b);
    }
    let lower = name.to_ascii_lowercase();
    INDEX.get(lower.as_str()).copied()
}

pub fn is_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

/// Prélude JS embarqué (défini les `pinescript.*`).
pub fn prelude_source() -> &'static str {
    include_str!("runtime/prelude.js")
}

/// Membres de premier niveau définis par le prélude (`pinescript.sma = …` → `sma`).
pub fn runtime_members() -> &'static BTreeSet<&'static str> {
    &MEMBERS
}

/// Cibles à envelopper par `pinescript.propagateNa`, ordre de la table, sans doublon.
pub fn propagating_targets() -> Vec<&'static str> {
    let mut seen = BTreeSet::new();
    BUILTINS
        .iter()
        .filter(|b| b.policy == NullPolicy::Propagate && !b.target.contains('.'))
        .filter(|b| seen.insert(b.target))
        .map(|b| b.target)
        .collect()
}

/// Façades d'espaces de noms : racine → (membre → cible), triées.
///
/// `array.push` (cible `arrayPush`) donne `array` → `push` → `arrayPush` ;
/// les entrées dont la cible est déjà le chemin pointé (`color.new`) sont omises.
pub fn namespace_aliases() -> BTreeMap<&'static str, BTreeMap<&'static str, &'static str>> {
    let mut out: BTreeMap<&'static str, BTreeMap<&'static str, &'static str>> = BTreeMap::new();
    for b in BUILTINS {
        let Some((root, member)) = b.name.split_once('.') else { continue };
        if b.target == b.name {
            continue;
        }
        out.entry(root).or_default().entry(member).or_insert(b.target);
    }
    out
}

fn scan_members(src: &'static str) -> BTreeSet<&'static str> {
    let prefix = "pinescript.";
    src.lines()
        .filter_map(|line| line.strip_prefix(prefix))
        .filter_map(|rest| {
            let end = rest.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))?;
            let (name, tail) = rest.split_at(end);
            (!name.is_empty() && tail.trim_start().starts_with('=')).then_some(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_dotted_names_resolve() {
        assert_eq!(lookup("ta.sma").map(Builtin::runtime_name).as_deref(), Some("pinescript.sma"));
        assert_eq!(lookup("sma").map(|b| b.target), Some("sma"));
        assert_eq!(lookup("array.push").map(|b| b.target), Some("arrayPush"));
        assert_eq!(lookup("str.tostring").map(|b| b.target), Some("strToString"));
        assert_eq!(lookup("color.new").map(Builtin::runtime_name).as_deref(), Some("pinescript.color.new"));
        assert_eq!(lookup("request.security").map(|b| b.target), Some("requestSecurity"));
        assert_eq!(lookup("strategy.entry").map(|b| b.target), Some("strategyEntry"));
        assert!(lookup("ta.unknown_thing").is_none());
    }

    #[test]
    fn lookup_falls_back_to_lowercase() {
        assert_eq!(lookup("TA.SMA").map(|b| b.target), Some("sma"));
        assert_eq!(lookup("Array.IndexOf").map(|b| b.target), Some("arrayIndexOf"));
    }

    #[test]
    fn arity_checks_and_hints() {
        let sma = lookup("ta.sma").expect("ta.sma");
        assert!(sma.accepts(2));
        assert!(!sma.accepts(3));
        assert_eq!(sma.arity_hint(), "2");
        let plot = lookup("plot").expect("plot");
        assert!(plot.accepts(12));
        assert_eq!(plot.arity_hint(), "1+");
        assert_eq!(lookup("ta.alma").expect("alma").arity_hint(), "4..5");
    }

    #[test]
    fn every_target_is_defined_by_the_prelude() {
        let members = runtime_members();
        for b in BUILTINS {
            let first = b.target.split('.').next().unwrap_or(b.target);
            assert!(members.contains(first), "{} → pinescript.{} absent du prélude", b.name, b.target);
        }
    }

    #[test]
    fn every_namespace_exists_at_runtime() {
        let members = runtime_members();
        for ns in NAMESPACES {
            assert!(members.contains(ns), "espace de noms {ns} absent du prélude");
        }
    }

    #[test]
    fn aliases_skip_self_targets_and_are_sorted() {
        let aliases = namespace_aliases();
        assert_eq!(aliases["array"]["push"], "arrayPush");
        assert_eq!(aliases["ta"]["crossover"], "crossover");
        assert!(!aliases.contains_key("color"));
        let roots: Vec<_> = aliases.keys().copied().collect();
        let mut sorted = roots.clone();
        sorted.sort_unstable();
        assert_eq!(roots, sorted);
    }

    #[test]
    fn propagating_targets_are_flat_and_unique() {
        let targets = propagating_targets();
        assert!(targets.contains(&"sma"));
        assert!(targets.contains(&"strLength"));
        assert!(!targets.contains(&"plot"));
        let unique: BTreeSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), targets.len());
    }
}
