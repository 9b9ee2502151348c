use std::sync::Arc;

use super::{Card, Deck, ShuffledCards};

/// Name the built-in deck is registered under.
pub const TOZAI_LINE_DECK: &str = "tozai_line";

/// (station number, kanji, kana reading, romaji)
const STATIONS: &[(&str, &str, &str, &str)] = &[
    ("T-01", "中野", "なかの", "Nakano"),
    ("T-02", "落合", "おちあい", "Ochiai"),
    ("T-03", "高田馬場", "たかだのばば", "Takadanobaba"),
    ("T-04", "早稲田", "わせだ", "Waseda"),
    ("T-05", "神楽坂", "かぐらざか", "Kagurazaka"),
    ("T-06", "飯田橋", "いいだばし", "Iidabashi"),
    ("T-07", "九段下", "くだんした", "Kudanshita"),
    ("T-08", "竹橋", "たけばし", "Takebashi"),
    ("T-09", "大手町", "おおてまち", "Otemachi"),
    ("T-10", "日本橋", "にほんばし", "Nihombashi"),
    ("T-11", "茅場町", "かやばちょう", "Kayabacho"),
    ("T-12", "門前仲町", "もんぜんなかちょう", "Monzen-nakacho"),
    ("T-13", "木場", "きば", "Kiba"),
    ("T-14", "東陽町", "とうようちょう", "Toyocho"),
    ("T-15", "南砂町", "みなみすなまち", "Minami-sunamachi"),
    ("T-16", "西葛西", "にしかさい", "Nishi-kasai"),
    ("T-17", "葛西", "かさい", "Kasai"),
    ("T-18", "浦安", "うらやす", "Urayasu"),
    ("T-19", "南行徳", "みなみぎょうとく", "Minami-gyotoku"),
    ("T-20", "行徳", "ぎょうとく", "Gyotoku"),
    ("T-21", "妙典", "みょうでん", "Myoden"),
    ("T-22", "原木中山", "ばらきなかやま", "Baraki-nakayama"),
    ("T-23", "西船橋", "にしふなばし", "Nishi-funabashi"),
];

/// Built-in deck asking for the reading of every Tokyo Metro Tozai line station.
#[derive(Debug, Clone)]
pub struct TozaiLineDeck {
    cards: ShuffledCards,
}

impl TozaiLineDeck {
    /// Build the deck in line order; call [`Deck::shuffle`] before playing.
    pub fn new() -> Self {
        let cards = STATIONS
            .iter()
            .map(|(number, kanji, kana, romaji)| {
                Card::new(
                    *kanji,
                    format!("Tozai line station {number}: how is this name read?"),
                    format!("{kanji}: {kana} ({romaji})"),
                    [*kana, *romaji],
                )
            })
            .collect();

        Self {
            cards: ShuffledCards::new(cards),
        }
    }
}

impl Default for TozaiLineDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck for TozaiLineDeck {
    fn name(&self) -> &str {
        TOZAI_LINE_DECK
    }

    fn shuffle(&mut self) {
        self.cards.shuffle();
    }

    fn draw(&mut self) -> Option<Arc<Card>> {
        self.cards.draw()
    }

    fn is_finished(&self) -> bool {
        self.cards.is_finished()
    }

    fn len(&self) -> usize {
        self.cards.len()
    }
}
