//! Haystack timezone names.
//!
//! The wire formats identify zones by the city portion of an IANA name
//! (`New_York` rather than `America/New_York`). A bidirectional map is
//! built lazily over the IANA database: exact whole-name matches first,
//! then single-level names whose suffix after the `/` is a known Haystack
//! name. Reverse lookups that miss the map fall back to matching the
//! UTC offset, which is lossy.

use std::collections::HashSet;

use bimap::BiMap;
use chrono::{NaiveDateTime, Offset, TimeZone};
use chrono_tz::{Tz, TZ_VARIANTS};
use once_cell::sync::Lazy;

use crate::error::{HaygridError, Result};

const HAYSTACK_TIMEZONES: &str = "Abidjan
Accra
Adak
Addis_Ababa
Adelaide
Aden
Algiers
Almaty
Amman
Amsterdam
Anadyr
Anchorage
Andorra
Antananarivo
Antigua
Apia
Aqtau
Aqtobe
Araguaina
Ashgabat
Asmara
Asuncion
Athens
Atikokan
Auckland
Azores
Baghdad
Bahia
Bahia_Banderas
Bahrain
Baku
Bangkok
Barbados
Beirut
Belem
Belgrade
Belize
Berlin
Bermuda
Beulah
Bishkek
Bissau
Blanc-Sablon
Boa_Vista
Bogota
Boise
Brisbane
Broken_Hill
Brunei
Brussels
Bucharest
Budapest
Buenos_Aires
Cairo
Cambridge_Bay
Campo_Grande
Canary
Cancun
Cape_Verde
Caracas
Casablanca
Casey
Catamarca
Cayenne
Cayman
Center
Ceuta
Chagos
Chatham
Chicago
Chihuahua
Chisinau
Chita
Choibalsan
Christmas
Chuuk
Cocos
Colombo
Comoro
Copenhagen
Cordoba
Costa_Rica
Creston
Cuiaba
Curacao
Currie
Damascus
Danmarkshavn
Dar_es_Salaam
Darwin
Davis
Dawson
Dawson_Creek
Denver
Detroit
Dhaka
Dili
Djibouti
Dubai
Dublin
DumontDUrville
Dushanbe
Easter
Edmonton
Efate
Eirunepe
El_Aaiun
El_Salvador
Enderbury
Eucla
Fakaofo
Faroe
Fiji
Fortaleza
Funafuti
GMT
GMT+1
GMT+10
GMT+11
GMT+12
GMT+2
GMT+3
GMT+4
GMT+5
GMT+6
GMT+7
GMT+8
GMT+9
GMT-1
GMT-10
GMT-11
GMT-12
GMT-13
GMT-14
GMT-2
GMT-3
GMT-4
GMT-5
GMT-6
GMT-7
GMT-8
GMT-9
Galapagos
Gambier
Gaza
Gibraltar
Glace_Bay
Godthab
Goose_Bay
Grand_Turk
Guadalcanal
Guam
Guatemala
Guayaquil
Guyana
Halifax
Havana
Hebron
Helsinki
Hermosillo
Ho_Chi_Minh
Hobart
Hong_Kong
Honolulu
Hovd
Indianapolis
Inuvik
Iqaluit
Irkutsk
Istanbul
Jakarta
Jamaica
Jayapura
Jerusalem
Johannesburg
Jujuy
Juneau
Kabul
Kaliningrad
Kamchatka
Kampala
Karachi
Kathmandu
Kerguelen
Khandyga
Khartoum
Kiev
Kiritimati
Knox
Kolkata
Kosrae
Krasnoyarsk
Kuala_Lumpur
Kuching
Kuwait
Kwajalein
La_Paz
La_Rioja
Lagos
Lima
Lindeman
Lisbon
London
Lord_Howe
Los_Angeles
Louisville
Luxembourg
Macau
Maceio
Macquarie
Madeira
Madrid
Magadan
Mahe
Majuro
Makassar
Maldives
Malta
Managua
Manaus
Manila
Maputo
Marengo
Marquesas
Martinique
Matamoros
Mauritius
Mawson
Mayotte
Mazatlan
Melbourne
Mendoza
Menominee
Merida
Metlakatla
Mexico_City
Midway
Minsk
Miquelon
Mogadishu
Monaco
Moncton
Monrovia
Monterrey
Montevideo
Monticello
Montreal
Moscow
Muscat
Nairobi
Nassau
Nauru
Ndjamena
New_Salem
New_York
Nicosia
Nipigon
Niue
Nome
Norfolk
Noronha
Noumea
Novokuznetsk
Novosibirsk
Ojinaga
Omsk
Oral
Oslo
Pago_Pago
Palau
Palmer
Panama
Pangnirtung
Paramaribo
Paris
Perth
Petersburg
Phnom_Penh
Phoenix
Pitcairn
Pohnpei
Pontianak
Port-au-Prince
Port_Moresby
Port_of_Spain
Porto_Velho
Prague
Puerto_Rico
Pyongyang
Qatar
Qyzylorda
Rainy_River
Rangoon
Rankin_Inlet
Rarotonga
Recife
Regina
Rel
Resolute
Reunion
Reykjavik
Riga
Rio_Branco
Rio_Gallegos
Riyadh
Rome
Rothera
Saipan
Sakhalin
Salta
Samara
Samarkand
San_Juan
San_Luis
Santa_Isabel
Santarem
Santiago
Santo_Domingo
Sao_Paulo
Scoresbysund
Seoul
Shanghai
Simferopol
Singapore
Sitka
Sofia
South_Georgia
Srednekolymsk
St_Johns
Stanley
Stockholm
Swift_Current
Sydney
Syowa
Tahiti
Taipei
Tallinn
Tarawa
Tashkent
Tbilisi
Tegucigalpa
Tehran
Tell_City
Thimphu
Thule
Thunder_Bay
Tijuana
Tirane
Tokyo
Tongatapu
Toronto
Tripoli
Troll
Tucuman
Tunis
UCT
UTC
Ulaanbaatar
Urumqi
Ushuaia
Ust-Nera
Uzhgorod
Vancouver
Vevay
Vienna
Vientiane
Vilnius
Vincennes
Vladivostok
Volgograd
Vostok
Wake
Wallis
Warsaw
Whitehorse
Winamac
Windhoek
Winnipeg
Yakutat
Yakutsk
Yekaterinburg
Yellowknife
Yerevan
Zaporozhye
Zurich";

static TZ_NAME_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HAYSTACK_TIMEZONES.lines().collect());

/// Haystack name <-> IANA zone. Exact whole-name matches win over
/// single-level suffix matches; among suffix matches the last zone in
/// database order wins, mirroring the source database construction.
static TZ_MAP: Lazy<BiMap<&'static str, Tz>> = Lazy::new(|| {
    let mut map = BiMap::new();
    let mut exact: HashSet<&'static str> = HashSet::new();
    for tz in TZ_VARIANTS.iter() {
        let iana = tz.name();
        if TZ_NAME_SET.contains(iana) {
            map.insert(iana, *tz);
            exact.insert(iana);
        }
    }
    for tz in TZ_VARIANTS.iter() {
        let iana = tz.name();
        if let Some((prefix, suffix)) = iana.split_once('/') {
            if !prefix.is_empty()
                && !suffix.contains('/')
                && TZ_NAME_SET.contains(suffix)
                && !exact.contains(suffix)
            {
                map.insert(suffix, *tz);
            }
        }
    }
    map
});

/// Map entries sorted by Haystack name, for deterministic reverse scans.
static TZ_BY_NAME: Lazy<Vec<(&'static str, Tz)>> = Lazy::new(|| {
    let mut entries: Vec<(&'static str, Tz)> =
        TZ_MAP.iter().map(|(name, tz)| (*name, *tz)).collect();
    entries.sort_by_key(|(name, _)| *name);
    entries
});

/// Resolve a Haystack zone name to an IANA zone.
pub fn timezone(name: &str) -> Result<Tz> {
    if name == "UTC" || name == "GMT" {
        return Ok(Tz::UTC);
    }
    TZ_MAP
        .get_by_left(name)
        .copied()
        .ok_or_else(|| HaygridError::Timezone(name.to_string()))
}

/// The Haystack name for an IANA zone, if the map knows it.
pub fn haystack_name(tz: Tz) -> Option<&'static str> {
    TZ_MAP.get_by_right(&tz).copied()
}

/// Find a Haystack zone name for a bare UTC offset at a given instant.
/// Zero maps to UTC; otherwise the first zone (by name) whose offset at
/// that instant matches is used. Lossy, but round-trips the instant.
pub fn timezone_name_for_offset(
    offset: chrono::FixedOffset,
    utc: NaiveDateTime,
) -> Result<String> {
    if offset.local_minus_utc() == 0 {
        return Ok("UTC".to_string());
    }
    for (name, tz) in TZ_BY_NAME.iter() {
        if tz.offset_from_utc_datetime(&utc).fix() == offset {
            return Ok((*name).to_string());
        }
    }
    Err(HaygridError::Timezone(format!(
        "no zone matches offset {offset}"
    )))
}
