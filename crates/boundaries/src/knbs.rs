//! The 47 counties with their Kenya National Bureau of Statistics codes.

/// One row of the county table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub region: &'static str,
}

const fn county(code: &'static str, name: &'static str, region: &'static str) -> CountyInfo {
    CountyInfo { code, name, region }
}

/// Counties in KNBS code order.
pub const KNBS_COUNTIES: [CountyInfo; 47] = [
    county("01", "Mombasa", "Coast"),
    county("02", "Kwale", "Coast"),
    county("03", "Kilifi", "Coast"),
    county("04", "Tana River", "Coast"),
    county("05", "Lamu", "Coast"),
    county("06", "Taita Taveta", "Coast"),
    county("07", "Garissa", "North Eastern"),
    county("08", "Wajir", "North Eastern"),
    county("09", "Mandera", "North Eastern"),
    county("10", "Marsabit", "Eastern"),
    county("11", "Isiolo", "Eastern"),
    county("12", "Meru", "Eastern"),
    county("13", "Tharaka Nithi", "Eastern"),
    county("14", "Embu", "Eastern"),
    county("15", "Kitui", "Eastern"),
    county("16", "Machakos", "Eastern"),
    county("17", "Makueni", "Eastern"),
    county("18", "Nyandarua", "Central"),
    county("19", "Nyeri", "Central"),
    county("20", "Kirinyaga", "Central"),
    county("21", "Murang'a", "Central"),
    county("22", "Kiambu", "Central"),
    county("23", "Turkana", "Rift Valley"),
    county("24", "West Pokot", "Rift Valley"),
    county("25", "Samburu", "Rift Valley"),
    county("26", "Trans Nzoia", "Rift Valley"),
    county("27", "Uasin Gishu", "Rift Valley"),
    county("28", "Elgeyo Marakwet", "Rift Valley"),
    county("29", "Nandi", "Rift Valley"),
    county("30", "Baringo", "Rift Valley"),
    county("31", "Nairobi", "Nairobi"),
    county("32", "Laikipia", "Rift Valley"),
    county("33", "Nakuru", "Rift Valley"),
    county("34", "Narok", "Rift Valley"),
    county("35", "Kajiado", "Rift Valley"),
    county("36", "Kericho", "Rift Valley"),
    county("37", "Bomet", "Rift Valley"),
    county("38", "Kakamega", "Western"),
    county("39", "Vihiga", "Western"),
    county("40", "Bungoma", "Western"),
    county("41", "Busia", "Western"),
    county("42", "Siaya", "Nyanza"),
    county("43", "Kisumu", "Nyanza"),
    county("44", "Homa Bay", "Nyanza"),
    county("45", "Migori", "Nyanza"),
    county("46", "Kisii", "Nyanza"),
    county("47", "Nyamira", "Nyanza"),
];

/// Table row for a code such as "31".
pub fn lookup(code: &str) -> Option<&'static CountyInfo> {
    KNBS_COUNTIES.iter().find(|c| c.code == code)
}

pub fn is_county_code(code: &str) -> bool {
    lookup(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_sequential() {
        for (i, info) in KNBS_COUNTIES.iter().enumerate() {
            assert_eq!(info.code, format!("{:02}", i + 1));
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("31").unwrap().name, "Nairobi");
        assert_eq!(lookup("47").unwrap().region, "Nyanza");
        assert!(lookup("48").is_none());
        assert!(!is_county_code("1"));
        assert!(!is_county_code("999"));
    }
}
