//! Unit symbol canonicalization.
//!
//! Quantities keep the unit text they were written with and resolve it
//! against a static alias table to a canonical symbol. Unknown symbols
//! pass through unchanged; no arithmetic or conversion is attempted.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Each line is `canonical,alias,alias,...`, distilled from the standard
/// unit database.
const UNIT_ALIASES: &str = "\
%,percent
px,pixel
db,decibel
A,ampere,amp
V,volt
ohm,Ω
W,watt
kW,kilowatt
MW,megawatt
Wh,watt_hour
kWh,kilowatt_hour
MWh,megawatt_hour
BTU,british_thermal_unit,btu
J,joule
kJ,kilojoule
MJ,megajoule
GJ,gigajoule
N,newton
Hz,hertz
kHz,kilohertz
°C,celsius,degC
°F,fahrenheit,degF
K,kelvin,degK
Δ°C,celsius_degrees
Δ°F,fahrenheit_degrees
m,meter,metre
mm,millimeter,millimetre
cm,centimeter,centimetre
km,kilometer,kilometre
in,inch,inches
ft,foot,feet
yd,yard
mile,miles
m²,square_meter,m2
ft²,square_foot,sqft,ft2
m³,cubic_meter,m3
ft³,cubic_foot,ft3
L,liter,litre
mL,milliliter,millilitre
gal,gallon
s,second,sec
min,minute
h,hour,hr
day,days
wk,week
mo,month
yr,year
Pa,pascal
kPa,kilopascal
bar,bars
psi,pounds_per_square_inch
atm,atmosphere
inH₂O,in/wc,inches_of_water,inH2O
mbar,millibar
g,gram
kg,kilogram
lb,pound
ton,tons
m/s,meters_per_second
km/h,kilometers_per_hour
mph,miles_per_hour
cfm,cubic_feet_per_minute
L/s,liters_per_second
L/min,liters_per_minute
m³/h,cubic_meters_per_hour,m3/h
gal/min,gpm,gallons_per_minute
kg/s,kilograms_per_second
ppm,parts_per_million
ppb,parts_per_billion
pH,PH
lx,lux
cd,candela
lm,lumen
$,dollar,USD
€,euro,EUR
£,pound_sterling,GBP
";

static ALIAS_TO_CANONICAL: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for line in UNIT_ALIASES.lines() {
        let mut symbols = line.split(',');
        let canonical = match symbols.next() {
            Some(c) if !c.is_empty() => c,
            _ => continue,
        };
        map.insert(canonical, canonical);
        for alias in symbols {
            map.insert(alias, canonical);
        }
    }
    map
});

/// Resolve a unit symbol to its canonical form, or hand it back untouched
/// when the table does not know it.
pub fn resolve_unit(symbol: &str) -> &str {
    match ALIAS_TO_CANONICAL.get(symbol) {
        Some(canonical) => canonical,
        None => symbol,
    }
}
