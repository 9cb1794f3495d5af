use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullKeplero {
    pub id: i64,
    pub numero_protocollo: String,
    pub utente_liquidatore: Option<String>,
    pub data_presentazione: String,
    pub data_inserimento: String,
    pub modified: String,
    pub descrizione_gruppo_tariffa: Option<String>,
    pub forma_assistenza: String,
    pub importo_richiesto: Option<String>,
    pub importo_riconosciuto: Option<String>,
    pub data_pagamento: Option<String>,
    pub cognome_persona: String,
    pub nome_persona: String,
    pub cognome_beneficiario: String,
    pub nome_beneficiario: String,
    pub unisal_inviato: Option<String>,
    pub stato_pratica: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondTable {
    pub id: i64,
    pub codice: String,
    pub descrizione: Option<String>,
    pub categoria: Option<String>,
    pub quantita: Option<i64>,
    pub data_riferimento: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KepleroCompare {
    pub item_id: Option<i64>,
    pub protocollo: String,
    pub coda: Option<String>,
    pub stato_pratica: Option<String>,
    pub stato: Option<String>,
    pub esito: Option<String>,
    pub data_esito: Option<NaiveDateTime>,
    #[serde(rename = "statoPratica_Keplero")]
    pub stato_pratica_keplero: String,
    pub riga: Option<i64>,
}

/// One row per distinct `NumeroProtocollo`.
///
/// The carried attributes come from the group's row with the lowest `Id`;
/// they are a representative sample, not an aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolloGrouped {
    pub numero_protocollo: String,
    pub count: i64,
    pub utente_liquidatore: Option<String>,
    pub data_presentazione: String,
    pub stato_pratica: String,
    pub forma_assistenza: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: i64,
}

/// Distinct-value histogram for one column, serialized as
/// `[{ <label>: value, count }]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub label: &'static str,
    pub buckets: Vec<ValueCount>,
}

impl Serialize for Histogram {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};

        struct Bucket<'a> {
            label: &'static str,
            entry: &'a ValueCount,
        }

        impl Serialize for Bucket<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(self.label, &self.entry.value)?;
                map.serialize_entry("count", &self.entry.count)?;
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.buckets.len()))?;
        for entry in &self.buckets {
            seq.serialize_element(&Bucket {
                label: self.label,
                entry,
            })?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareStatistics {
    pub total_records: i64,
    pub by_coda: Histogram,
    pub by_stato_pratica: Histogram,
    pub by_stato: Histogram,
    pub by_stato_pratica_keplero: Histogram,
    pub by_esito: Histogram,
}
