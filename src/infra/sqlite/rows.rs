use rusqlite::Row;

use crate::infra::import::parse_datetime;

use crate::domain::entities::keplero::{
    FullKeplero, KepleroCompare, ProtocolloGrouped, SecondTable,
};

/// A typed row read back from a `SELECT` over `SELECT_COLUMNS`, in order.
pub trait TableRow: Sized {
    const SELECT_COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn select_list() -> String {
        Self::SELECT_COLUMNS.join(", ")
    }
}

impl TableRow for FullKeplero {
    const SELECT_COLUMNS: &'static [&'static str] = &[
        "Id",
        "NumeroProtocollo",
        "UtenteLiquidatore",
        "DataPresentazione",
        "DataInserimento",
        "Modified",
        "DescrizioneGruppoTariffa",
        "FormaAssistenza",
        "ImportoRichiesto",
        "ImportoRiconosciuto",
        "DataPagamento",
        "CognomePersona",
        "NomePersona",
        "CognomeBeneficiario",
        "NomeBeneficiario",
        "UnisalInviato",
        "StatoPratica",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FullKeplero {
            id: row.get(0)?,
            numero_protocollo: row.get(1)?,
            utente_liquidatore: row.get(2)?,
            data_presentazione: row.get(3)?,
            data_inserimento: row.get(4)?,
            modified: row.get(5)?,
            descrizione_gruppo_tariffa: row.get(6)?,
            forma_assistenza: row.get(7)?,
            importo_richiesto: row.get(8)?,
            importo_riconosciuto: row.get(9)?,
            data_pagamento: row.get(10)?,
            cognome_persona: row.get(11)?,
            nome_persona: row.get(12)?,
            cognome_beneficiario: row.get(13)?,
            nome_beneficiario: row.get(14)?,
            unisal_inviato: row.get(15)?,
            stato_pratica: row.get(16)?,
        })
    }
}

impl TableRow for SecondTable {
    const SELECT_COLUMNS: &'static [&'static str] = &[
        "Id",
        "Codice",
        "Descrizione",
        "Categoria",
        "Quantita",
        "DataRiferimento",
        "Note",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SecondTable {
            id: row.get(0)?,
            codice: row.get(1)?,
            descrizione: row.get(2)?,
            categoria: row.get(3)?,
            quantita: row.get(4)?,
            data_riferimento: row.get(5)?,
            note: row.get(6)?,
        })
    }
}

impl TableRow for KepleroCompare {
    const SELECT_COLUMNS: &'static [&'static str] = &[
        "ItemId",
        "Protocollo",
        "Coda",
        "StatoPratica",
        "Stato",
        "Esito",
        "DataEsito",
        "StatoPratica_Keplero",
        "Riga",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(KepleroCompare {
            item_id: row.get(0)?,
            protocollo: row.get(1)?,
            coda: row.get(2)?,
            stato_pratica: row.get(3)?,
            stato: row.get(4)?,
            esito: row.get(5)?,
            // Stored as free text by external loaders; unparsable values read as None.
            data_esito: row
                .get::<_, Option<String>>(6)?
                .as_deref()
                .and_then(|raw| parse_datetime(raw.trim())),
            stato_pratica_keplero: row.get(7)?,
            riga: row.get(8)?,
        })
    }
}

impl TableRow for ProtocolloGrouped {
    const SELECT_COLUMNS: &'static [&'static str] = &[
        "g.NumeroProtocollo",
        "g.RowCount",
        "r.UtenteLiquidatore",
        "r.DataPresentazione",
        "r.StatoPratica",
        "r.FormaAssistenza",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ProtocolloGrouped {
            numero_protocollo: row.get(0)?,
            count: row.get(1)?,
            utente_liquidatore: row.get(2)?,
            data_presentazione: row.get(3)?,
            stato_pratica: row.get(4)?,
            forma_assistenza: row.get(5)?,
        })
    }
}
