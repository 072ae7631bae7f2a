
/// A resizable vector of fixed-bit-width unsigned integers packed into 64-bit words.
/// Element `i` occupies bits `[i*width, (i+1)*width)` of the buffer, little-endian
/// within each word, so an element may straddle a word boundary.
#[derive(Clone, Debug)]
pub struct PackedVector {
    /// bits per element, 0 < width <= 64
    width: u8,
    /// number of stored elements
    len: usize,
    /// packed storage, sized to hold `len` elements
    words: Vec<u64>,
}

#[inline]
fn mask(width: u8) -> u64 {
    if width == 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[inline]
fn words_for(len: usize, width: u8) -> usize {
    (len * width as usize + 63) / 64
}

impl PackedVector {
    /// Creates an empty vector storing `width`-bit elements.
    pub fn new(width: u8) -> Self {
        assert!(width > 0 && width <= 64);
        PackedVector {
            width,
            len: 0,
            words: vec![],
        }
    }

    /// Creates a zero-filled vector of `len` elements of `width` bits each.
    pub fn with_len(width: u8, len: usize) -> Self {
        assert!(width > 0 && width <= 64);
        PackedVector {
            width,
            len,
            words: vec![0; words_for(len, width)],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Reads the element at `index`.
    #[inline]
    pub fn read(&self, index: usize) -> u64 {
        assert!(index < self.len);
        let w = self.width as usize;
        let bit = index * w;
        let word = bit / 64;
        let shift = bit % 64;
        if shift + w <= 64 {
            (self.words[word] >> shift) & mask(self.width)
        } else {
            //element straddles into the next word
            let lo = self.words[word] >> shift;
            let hi = self.words[word + 1] << (64 - shift);
            (lo | hi) & mask(self.width)
        }
    }

    /// Writes `value` at `index`; `value` must fit in the current width.
    #[inline]
    pub fn write(&mut self, index: usize, value: u64) {
        assert!(index < self.len);
        debug_assert!(value <= mask(self.width));
        let w = self.width as usize;
        let bit = index * w;
        let word = bit / 64;
        let shift = bit % 64;
        let m = mask(self.width);
        self.words[word] = (self.words[word] & !(m << shift)) | (value << shift);
        if shift + w > 64 {
            let spill = 64 - shift;
            self.words[word + 1] = (self.words[word + 1] & !(m >> spill)) | (value >> spill);
        }
    }

    /// Appends `value` to the end of the vector.
    #[inline]
    pub fn push(&mut self, value: u64) {
        self.len += 1;
        let needed = words_for(self.len, self.width);
        if self.words.len() < needed {
            self.words.resize(needed, 0);
        }
        self.write(self.len - 1, value);
    }

    /// Grows the vector to `new_len` elements, zero-filling the tail.
    /// Capacity is never shrunk.
    pub fn resize(&mut self, new_len: usize) {
        assert!(new_len >= self.len);
        let old_len = self.len;
        self.len = new_len;
        let needed = words_for(new_len, self.width);
        if self.words.len() < needed {
            self.words.resize(needed, 0);
        }
        //zero any bits the previous tail element may have left behind
        for i in old_len..new_len {
            self.write(i, 0);
        }
    }

    /// Rewrites every element at a new bit width. Widening preserves all values;
    /// narrowing requires that every stored value fits in `new_width` bits.
    pub fn change_width(&mut self, new_width: u8) {
        assert!(new_width > 0 && new_width <= 64);
        if new_width == self.width {
            return;
        }
        let mut rewritten = PackedVector::with_len(new_width, self.len);
        for i in 0..self.len {
            let v = self.read(i);
            debug_assert!(v <= mask(new_width));
            rewritten.write(i, v);
        }
        *self = rewritten;
    }

    /// Moves `count` elements from `src` to `dst` within this vector.
    /// Source and destination ranges may overlap; the copy direction is chosen
    /// so no element is clobbered before it is read.
    pub fn copy_within(&mut self, src: usize, dst: usize, count: usize) {
        assert!(src + count <= self.len && dst + count <= self.len);
        if dst <= src {
            for i in 0..count {
                let v = self.read(src + i);
                self.write(dst + i, v);
            }
        } else {
            for i in (0..count).rev() {
                let v = self.read(src + i);
                self.write(dst + i, v);
            }
        }
    }

    /// Iterates the stored values in index order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).map(move |i| self.read(i))
    }
}
