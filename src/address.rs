use crate::entities::Address;
use crate::models::RawAddress;
use crate::normalize::{clean_text, normalize_ws, title_case};

const UNIT_DESIGNATORS: &[&str] = &["APT", "UNIT", "STE", "SUITE", "BLDG", "RM"];

const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY", "PR",
];

fn directional(token: &str) -> Option<&'static str> {
    Some(match token {
        "N" | "NORTH" => "N",
        "S" | "SOUTH" => "S",
        "E" | "EAST" => "E",
        "W" | "WEST" => "W",
        "NE" | "NORTHEAST" => "NE",
        "NW" | "NORTHWEST" => "NW",
        "SE" | "SOUTHEAST" => "SE",
        "SW" | "SOUTHWEST" => "SW",
        _ => return None,
    })
}

fn street_suffix(token: &str) -> Option<&'static str> {
    Some(match token {
        "ST" | "STREET" => "St",
        "AVE" | "AV" | "AVENUE" => "Ave",
        "RD" | "ROAD" => "Rd",
        "DR" | "DRIVE" => "Dr",
        "LN" | "LANE" => "Ln",
        "CT" | "COURT" => "Ct",
        "BLVD" | "BOULEVARD" => "Blvd",
        "WAY" | "WY" => "Way",
        "PL" | "PLACE" => "Pl",
        "CIR" | "CIRCLE" => "Cir",
        "TER" | "TERR" | "TERRACE" => "Ter",
        "TRL" | "TRAIL" => "Trl",
        "PKWY" | "PARKWAY" => "Pkwy",
        "HWY" | "HIGHWAY" => "Hwy",
        "LOOP" => "Loop",
        "RUN" => "Run",
        "PATH" => "Path",
        "PIKE" => "Pike",
        "ROW" => "Row",
        "SQ" | "SQUARE" => "Sq",
        "CV" | "COVE" => "Cv",
        "PT" | "POINT" => "Pt",
        "XING" | "CROSSING" => "Xing",
        "PASS" => "Pass",
        "ALY" | "ALLEY" => "Aly",
        "EXPY" | "EXPRESSWAY" => "Expy",
        _ => return None,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
struct StreetLine {
    number: String,
    pre_directional: Option<String>,
    name: String,
    suffix: Option<String>,
    post_directional: Option<String>,
    unit: Option<String>,
}

fn parse_street_line(line: &str) -> Option<StreetLine> {
    let upper = normalize_ws(line).to_uppercase();
    let mut tokens: Vec<&str> = upper.split(' ').filter(|t| !t.is_empty()).collect();

    let number = tokens.first().filter(|t| t.starts_with(|c: char| c.is_ascii_digit()))?;
    let number = number.to_string();
    tokens.remove(0);

    let mut unit = None;
    if let Some(pos) = tokens
        .iter()
        .position(|t| UNIT_DESIGNATORS.contains(t) || t.starts_with('#'))
    {
        let rest: Vec<&str> = tokens.split_off(pos);
        let designator = rest[0];
        let value = if let Some(stripped) = designator.strip_prefix('#').filter(|s| !s.is_empty()) {
            stripped.to_string()
        } else {
            rest[1..].join(" ")
        };
        unit = Some(value).filter(|v| !v.is_empty());
    }

    let mut pre_directional = None;
    if tokens.len() > 1 {
        if let Some(dir) = directional(tokens[0]) {
            pre_directional = Some(dir.to_string());
            tokens.remove(0);
        }
    }

    let mut post_directional = None;
    if tokens.len() > 1 {
        if let Some(dir) = tokens.last().and_then(|t| directional(t)) {
            post_directional = Some(dir.to_string());
            tokens.pop();
        }
    }

    let mut suffix = None;
    if tokens.len() > 1 {
        if let Some(canonical) = tokens.last().and_then(|t| street_suffix(t)) {
            suffix = Some(canonical.to_string());
            tokens.pop();
        }
    }

    if tokens.is_empty() {
        return None;
    }

    Some(StreetLine {
        number,
        pre_directional,
        name: tokens.join(" "),
        suffix,
        post_directional,
        unit,
    })
}

fn parse_state_zip(segment: &str) -> (Option<String>, Option<String>, Option<String>) {
    let upper = normalize_ws(segment).to_uppercase();
    let mut state = None;
    let mut zip = None;
    let mut plus_four = None;
    for token in upper.split(' ') {
        if STATE_CODES.contains(&token) {
            state = Some(token.to_string());
        } else if let Some((five, four)) = split_zip(token) {
            zip = Some(five);
            plus_four = four;
        }
    }
    (state, zip, plus_four)
}

fn split_zip(token: &str) -> Option<(String, Option<String>)> {
    let (five, four) = match token.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (token, None),
    };
    let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
    if !digits(five, 5) {
        return None;
    }
    let four = four.filter(|f| digits(f, 4)).map(str::to_string);
    Some((five.to_string(), four))
}

pub fn parse_one_line(line: &str) -> Option<Address> {
    let segments: Vec<&str> = line.split(',').map(str::trim).collect();
    let street = parse_street_line(segments.first()?)?;

    let mut address = Address {
        street_number: Some(street.number),
        street_pre_directional_text: street.pre_directional,
        street_name: Some(street.name),
        street_suffix_type: street.suffix,
        street_post_directional_text: street.post_directional,
        unit_identifier: street.unit,
        ..Address::default()
    };

    match segments.len() {
        0 | 1 => {}
        2 => {
            // "CITY FL 32601" in a single trailing segment
            let (state, zip, plus_four) = parse_state_zip(segments[1]);
            let city: Vec<&str> = segments[1]
                .split_whitespace()
                .take_while(|t| !STATE_CODES.contains(&t.to_uppercase().as_str()))
                .collect();
            address.city_name = clean_text(Some(city.join(" ").as_str())).map(|c| c.to_uppercase());
            address.state_code = state;
            address.postal_code = zip;
            address.plus_four_postal_code = plus_four;
        }
        _ => {
            address.city_name = clean_text(Some(segments[1])).map(|c| c.to_uppercase());
            let (state, zip, plus_four) = parse_state_zip(&segments[2..].join(" "));
            address.state_code = state;
            address.postal_code = zip;
            address.plus_four_postal_code = plus_four;
        }
    }
    Some(address)
}

pub fn build_site_address(raw: &RawAddress) -> Option<Address> {
    let full = clean_text(raw.full.as_deref());
    let mut address = full
        .as_deref()
        .and_then(parse_one_line)
        .unwrap_or_default();

    if let Some(number) = clean_text(raw.street_number.as_deref()) {
        address.street_number = Some(number);
    }
    if let Some(name) = clean_text(raw.street_name.as_deref()) {
        address.street_name = Some(name.to_uppercase());
    }
    if let Some(unit) = clean_text(raw.unit.as_deref()) {
        address.unit_identifier = Some(unit);
    }
    if let Some(city) = clean_text(raw.city.as_deref()) {
        address.city_name = Some(city.to_uppercase());
    }
    if let Some(state) = clean_text(raw.state.as_deref()) {
        address.state_code = Some(state.to_uppercase());
    }
    if let Some((zip, plus_four)) = raw.postal_code.as_deref().and_then(|z| split_zip(z.trim())) {
        address.postal_code = Some(zip);
        address.plus_four_postal_code = plus_four;
    }

    let structured = address.street_number.is_some() && address.street_name.is_some();
    if !structured {
        address = Address {
            unnormalized_address: full,
            ..Address::default()
        };
    } else if address
        .state_code
        .as_deref()
        .is_some_and(|s| STATE_CODES.contains(&s))
    {
        address.country_code = Some("US".to_string());
    }

    address.county_name = clean_text(raw.county.as_deref()).map(|c| title_case(&c));
    address.section = clean_text(raw.section.as_deref());
    address.township = clean_text(raw.township.as_deref());
    address.range = clean_text(raw.range.as_deref());
    address.lot = clean_text(raw.lot.as_deref());
    address.block = clean_text(raw.block.as_deref());

    (address != Address::default()).then_some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_one_line_address() {
        let address = parse_one_line("123 n main street apt 4, Gainesville, FL 32601-1234")
            .expect("structured");
        assert_eq!(address.street_number.as_deref(), Some("123"));
        assert_eq!(address.street_pre_directional_text.as_deref(), Some("N"));
        assert_eq!(address.street_name.as_deref(), Some("MAIN"));
        assert_eq!(address.street_suffix_type.as_deref(), Some("St"));
        assert_eq!(address.unit_identifier.as_deref(), Some("4"));
        assert_eq!(address.city_name.as_deref(), Some("GAINESVILLE"));
        assert_eq!(address.state_code.as_deref(), Some("FL"));
        assert_eq!(address.postal_code.as_deref(), Some("32601"));
        assert_eq!(address.plus_four_postal_code.as_deref(), Some("1234"));
    }

    #[test]
    fn post_directional_and_hash_unit() {
        let address = parse_one_line("4500 OAK RIDGE BLVD SW #12").expect("structured");
        assert_eq!(address.street_name.as_deref(), Some("OAK RIDGE"));
        assert_eq!(address.street_suffix_type.as_deref(), Some("Blvd"));
        assert_eq!(address.street_post_directional_text.as_deref(), Some("SW"));
        assert_eq!(address.unit_identifier.as_deref(), Some("12"));
        assert_eq!(address.city_name, None);
    }

    #[test]
    fn lone_directional_is_the_street_name() {
        let address = parse_one_line("10 WEST").expect("structured");
        assert_eq!(address.street_name.as_deref(), Some("WEST"));
        assert_eq!(address.street_pre_directional_text, None);
    }

    #[test]
    fn city_state_zip_in_one_segment() {
        let address = parse_one_line("9 ELM CT, OCALA FL 34471").expect("structured");
        assert_eq!(address.city_name.as_deref(), Some("OCALA"));
        assert_eq!(address.state_code.as_deref(), Some("FL"));
        assert_eq!(address.postal_code.as_deref(), Some("34471"));
    }

    #[test]
    fn unparseable_line_falls_back_to_unnormalized() {
        let raw = RawAddress {
            full: Some("NO SITUS ADDRESS".to_string()),
            county: Some("ALACHUA".to_string()),
            section: Some("12".to_string()),
            ..RawAddress::default()
        };
        let address = build_site_address(&raw).expect("address");
        assert_eq!(address.unnormalized_address.as_deref(), Some("NO SITUS ADDRESS"));
        assert_eq!(address.street_name, None);
        assert_eq!(address.county_name.as_deref(), Some("Alachua"));
        assert_eq!(address.section.as_deref(), Some("12"));
    }

    #[test]
    fn structured_parts_override_parsed_ones() {
        let raw = RawAddress {
            full: Some("12 PINE ST, TAMPA, FL 33601".to_string()),
            city: Some("Temple Terrace".to_string()),
            postal_code: Some("33617-0001".to_string()),
            ..RawAddress::default()
        };
        let address = build_site_address(&raw).expect("address");
        assert_eq!(address.city_name.as_deref(), Some("TEMPLE TERRACE"));
        assert_eq!(address.postal_code.as_deref(), Some("33617"));
        assert_eq!(address.plus_four_postal_code.as_deref(), Some("0001"));
        assert_eq!(address.country_code.as_deref(), Some("US"));
        assert_eq!(address.unnormalized_address, None);
    }

    #[test]
    fn empty_bag_yields_no_address() {
        assert_eq!(build_site_address(&RawAddress::default()), None);
    }
}
