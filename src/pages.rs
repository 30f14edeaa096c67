//! Logical pages of the student information system.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// A page the client knows how to fetch and extract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Profile,
    Transcript,
    Courses,
    Fees,
    Attendance,
    Announcements,
    WeeklySchedule,
    Messages,
    Library,
    Registration,
    Thesis,
    Internships,
    Petitions,
    Materials,
    Events,
    /// Links to the distance-learning platforms in the student menu
    OnlineEducation,
    /// Filled in by client-side script; not extractable from server HTML
    ExamSchedule,
    /// Filled in by client-side script; not extractable from server HTML
    GpaCalculator,
}

impl PageKind {
    /// Known locations of the page, most common first.
    ///
    /// Deployments of the records system moved some pages between versions,
    /// so several candidates are tried in order.
    pub fn default_paths(&self) -> &'static [&'static str] {
        match self {
            PageKind::Profile | PageKind::Announcements => &["/Birimler/Ogrenci/Bilgilerim.aspx"],
            PageKind::Transcript => &[
                "/Birimler/Ogrenci/Transkript.aspx",
                "/Birimler/Ogrenci/NotBilgileri.aspx",
            ],
            PageKind::Courses => &[
                "/Birimler/Ogrenci/Derslerim.aspx",
                "/Birimler/Ogrenci/DonemDersleri.aspx",
            ],
            PageKind::Fees => &[
                "/Birimler/Ogrenci/HarcBilgileri.aspx",
                "/Birimler/Ogrenci/Odemeler.aspx",
                "/Birimler/Ogrenci/MaliIsler.aspx",
            ],
            PageKind::Attendance => &[
                "/Birimler/Ogrenci/Devamsizlik.aspx",
                "/Birimler/Ogrenci/Yoklama.aspx",
                "/Birimler/Ogrenci/DevamsizlikTakip.aspx",
            ],
            PageKind::WeeklySchedule => &[
                "/Birimler/Ogrenci/DersProgrami.aspx",
                "/Birimler/Ogrenci/DersProgram.aspx",
                "/Birimler/Ogrenci/Program.aspx",
            ],
            PageKind::Messages => &["/Birimler/Ogrenci/Mesajlarim.aspx"],
            PageKind::Library => &[
                "/Birimler/Ogrenci/Kutuphane.aspx",
                "/Birimler/Ogrenci/Malzeme.aspx",
                "/Birimler/Ogrenci/Material.aspx",
            ],
            PageKind::Registration => &[
                "/Birimler/Ogrenci/KayitYenileme.aspx",
                "/Birimler/Ogrenci/DersKayit.aspx",
                "/Birimler/Ogrenci/DersEkleCikar.aspx",
            ],
            PageKind::Thesis => &[
                "/Birimler/Ogrenci/BitirmeTezi.aspx",
                "/Birimler/Ogrenci/TezIslemleri.aspx",
                "/Birimler/Ogrenci/TezBasvurulari.aspx",
            ],
            PageKind::Internships => &[
                "/Birimler/Ogrenci/ZorunluStajBasvuru.aspx",
                "/Birimler/Ogrenci/StajBasvurulari.aspx",
                "/Birimler/Ogrenci/Staj.aspx",
            ],
            PageKind::Petitions => &[
                "/Birimler/Ogrenci/DilekceIslemleri.aspx",
                "/Birimler/Ogrenci/Dilekce.aspx",
            ],
            PageKind::Materials => &[
                "/Birimler/Ogrenci/DersDokumanlari.aspx",
                "/Birimler/Ogrenci/Dokumanlar.aspx",
            ],
            PageKind::Events => &[
                "/Birimler/Ogrenci/Etkinlikler.aspx",
                "/Birimler/Ogrenci/Etkinlik.aspx",
            ],
            PageKind::OnlineEducation => &["/Birimler/Ogrenci/"],
            PageKind::ExamSchedule => &["/Birimler/Ogrenci/SinavProgrami.aspx"],
            PageKind::GpaCalculator => &["/Birimler/Ogrenci/OrtalamaHesapla.aspx"],
        }
    }
}
