//! Longest-match-first term normalization.
//!
//! The log prose mixes English faction and unit-type phrases; reports
//! render them in Japanese. Longer phrases must be substituted before
//! their sub-phrases ("Main Battle Tank Division" before "Division"),
//! so the key ordering is computed once at construction and every
//! `translate` call walks it in that fixed order.

use std::collections::HashMap;

/// Built-in term table. Country names first, then unit-type phrases.
pub const DEFAULT_TERMS: &[(&str, &str)] = &[
    // ── Countries / factions ──
    ("Great Britain", "イギリス"),
    ("United Kingdom", "イギリス"),
    ("France", "フランス"),
    ("Germany", "ドイツ"),
    ("German Empire", "ドイツ帝国"),
    ("Italy", "イタリア"),
    ("Russia", "ロシア"),
    ("Ottoman Empire", "オスマン帝国"),
    ("Turkey", "トルコ"),
    ("Spain", "スペイン"),
    ("Portugal", "ポルトガル"),
    ("Sweden", "スウェーデン"),
    ("Norway", "ノルウェー"),
    ("Denmark", "デンマーク"),
    ("Finland", "フィンランド"),
    ("Iceland", "アイスランド"),
    ("Poland", "ポーランド"),
    ("Ukraine", "ウクライナ"),
    ("Lithuania", "リトアニア"),
    ("Latvia", "ラトビア"),
    ("Estonia", "エストニア"),
    ("Romania", "ルーマニア"),
    ("Bulgaria", "ブルガリア"),
    ("Greece", "ギリシャ"),
    ("Serbia", "セルビア"),
    ("Egypt", "エジプト"),
    ("Libya", "リビア"),
    ("Algeria", "アルジェリア"),
    ("Morocco", "モロッコ"),
    ("Arabia", "アラビア"),
    ("Syria", "シリア"),
    ("Iraq", "イラク"),
    ("Persia", "ペルシャ"),
    ("India", "インド"),
    ("United States", "アメリカ"),
    ("Canada", "カナダ"),
    ("Brazil", "ブラジル"),
    ("Argentina", "アルゼンチン"),
    ("Caucasus", "カフカース"),
    ("Kazakhstan", "カザフスタン"),
    ("Belarus", "ベラルーシ"),
    ("Balkan Union", "バルカン連邦"),
    ("Baltic States", "バルト三国"),
    ("Sudan", "スーダン"),
    ("Mongolia", "モンゴル"),
    ("China", "中国"),
    ("Japan", "日本"),
    ("Australia", "オーストラリア"),
    ("Colombia", "コロンビア"),
    ("Venezuela", "ベネズエラ"),
    ("Peru", "ペルー"),
    ("Chile", "チリ"),
    ("Mexico", "メキシコ"),
    ("Undead", "アンデッド"),
    ("Rogue State", "反乱軍"),
    // ── Unit types ──
    ("Infantry Battalion", "歩兵大隊"),
    ("Motorized Infantry Battalion", "自動車化歩兵大隊"),
    ("Motorized Infantry", "自動車化歩兵"),
    ("Mechanized Infantry Battalion", "機械化歩兵大隊"),
    ("Mechanized Infantry", "機械化歩兵"),
    ("Naval Infantry Battalion", "海兵隊大隊"),
    ("Naval Infantry", "海兵隊"),
    ("Airborne Infantry Battalion", "空挺歩兵大隊"),
    ("Airborne Infantry", "空挺歩兵"),
    ("Special Forces Battalion", "特殊部隊大隊"),
    ("Special Forces", "特殊部隊"),
    ("National Guard Battalion", "州兵大隊"),
    ("National Guard", "州兵"),
    ("Combat Recon Vehicle Battalion", "戦闘偵察車大隊"),
    ("Combat Recon Vehicle", "戦闘偵察車"),
    ("Armored Fighting Vehicle Battalion", "装甲戦闘車大隊"),
    ("Armored Fighting Vehicle", "装甲戦闘車"),
    ("Amphibious Combat Vehicle", "水陸両用戦闘車"),
    ("Main Battle Tank Division", "主力戦車師団"),
    ("Main Battle Tank", "主力戦車"),
    ("Tank Destroyer Division", "駆逐戦車師団"),
    ("Tank Destroyer", "駆逐戦車"),
    ("Tank Division", "戦車師団"),
    ("Towed Artillery", "榴弾砲"),
    ("Artillery Division", "砲兵師団"),
    ("Mobile Artillery Division", "自走砲師団"),
    ("Mobile Artillery", "自走砲"),
    ("Multiple Rocket Launcher Division", "多連装ロケット師団"),
    ("Multiple Rocket Launcher", "多連装ロケット"),
    ("Mobile Anti-Air Division", "自走対空砲師団"),
    ("Mobile Anti-Air Vehicle", "自走対空砲"),
    ("SAM Launcher Division", "SAM師団"),
    ("Mobile SAM Launcher", "SAM"),
    ("Theater Defense System Division", "TDS師団"),
    ("Theater Defense System", "TDS"),
    ("Mobile Radar", "地上レーダー"),
    ("Helicopter Gunship Squadron", "武装ヘリ飛行隊"),
    ("Helicopter Gunship", "武装ヘリ"),
    ("Attack Helicopter Squadron", "攻撃ヘリ飛行隊"),
    ("Attack Helicopter", "攻撃ヘリ"),
    ("ASW Helicopter Squadron", "対潜ヘリ飛行隊"),
    ("ASW Helicopter", "対潜ヘリ"),
    ("Transport Helicopter", "輸送ヘリ"),
    ("Air Superiority Fighter", "制空戦闘機"),
    ("Air Superiority Squadron", "制空戦闘機飛行隊"),
    ("Strike Fighter Squadron", "打撃戦闘機飛行隊"),
    ("Strike Fighter", "打撃戦闘機"),
    ("Strike Wing", "打撃戦闘機航空団"),
    ("Naval Patrol Squadron", "哨戒機飛行隊"),
    ("Naval Patrol Aircraft", "哨戒機"),
    ("AWACS", "早期警戒管制機"),
    ("Heavy Bomber", "重爆撃機"),
    ("Bomber Wing", "爆撃航空団"),
    ("Stealth Air Superiority Fighter", "ステルス制空"),
    ("Stealth Strike Fighter", "ステルス打撃"),
    ("Corvette", "コルベット"),
    ("Frigate", "フリゲート"),
    ("Destroyer", "駆逐艦"),
    ("Cruiser", "巡洋艦"),
    ("Aircraft Carrier", "空母"),
    ("Attack Submarine", "攻撃型潜水艦"),
    ("Ballistic Missile Submarine", "弾道ミサイル潜水艦"),
    ("Military Unit", "部隊(正体不明)"),
    ("Undead Horde", "ゾンビの大群"),
    ("Elite Anti-Air Division", "精鋭対空師団"),
    ("Elite Infantry Division", "精鋭歩兵師団"),
    ("Elite Fighter Wing", "精鋭戦闘機航空団"),
    ("Elite Fighter Squadron", "精鋭戦闘機飛行隊"),
    ("Drone Operator", "ドローンオペレーター"),
];

/// A term dictionary with the substitution order precomputed.
#[derive(Debug, Clone)]
pub struct TermDict {
    exact: HashMap<String, String>,
    /// (key, value) pairs sorted by descending key length.
    ordered: Vec<(String, String)>,
}

impl TermDict {
    /// Build from an arbitrary phrase → phrase mapping.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let exact: HashMap<String, String> = entries.into_iter().collect();
        let mut ordered: Vec<(String, String)> =
            exact.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        // Longest key first; equal lengths tie-break lexicographically
        // so the substitution order is deterministic.
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        TermDict { exact, ordered }
    }

    /// The built-in table plus caller-supplied overrides/additions.
    pub fn with_extra(extra: &HashMap<String, String>) -> Self {
        let mut entries: HashMap<String, String> = DEFAULT_TERMS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in extra {
            entries.insert(k.clone(), v.clone());
        }
        Self::new(entries)
    }

    /// Translate a phrase. Exact dictionary hits map directly; anything
    /// else gets substring replacement in longest-key-first order. Pure
    /// function of the input for a fixed dictionary.
    pub fn translate(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        if let Some(v) = self.exact.get(text) {
            return v.clone();
        }
        let mut out = text.to_string();
        for (key, value) in &self.ordered {
            if out.contains(key.as_str()) {
                out = out.replace(key.as_str(), value);
            }
        }
        out
    }
}

impl Default for TermDict {
    fn default() -> Self {
        Self::new(
            DEFAULT_TERMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }
}
