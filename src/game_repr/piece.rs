#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub piece_type: Type,
}

impl Default for Piece {
    fn default() -> Self {
        Self {
            color: Color::White,
            piece_type: Type::None,
        }
    }
}

impl Piece {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.piece_type == Type::None
    }

    pub fn from_char(c: char) -> Result<Self, char> {
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        let piece_type = match c.to_ascii_lowercase() {
            'p' => Type::Pawn,
            'n' => Type::Knight,
            'b' => Type::Bishop,
            'r' => Type::Rook,
            'q' => Type::Queen,
            'k' => Type::King,
            _ => return Err(c),
        };
        Ok(Self { color, piece_type })
    }

    pub fn to_char(&self) -> char {
        let c = match self.piece_type {
            Type::Pawn => 'p',
            Type::Knight => 'n',
            Type::Bishop => 'b',
            Type::Rook => 'r',
            Type::Queen => 'q',
            Type::King => 'k',
            Type::None => return ' ',
        };
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is(&self, color: Color) -> bool {
        self.color == color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_char_roundtrips_through_to_char() {
        for c in ['P', 'N', 'B', 'R', 'Q', 'K', 'p', 'n', 'b', 'r', 'q', 'k'] {
            assert_eq!(Piece::from_char(c).unwrap().to_char(), c);
        }
    }

    #[test]
    fn from_char_rejects_unknown_letters() {
        assert_eq!(Piece::from_char('x'), Err('x'));
    }

    #[test]
    fn opposite_color_is_involutive() {
        assert_eq!(Color::White.opposite().opposite(), Color::White);
    }
}
